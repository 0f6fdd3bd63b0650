mod common;

use common::{admin_actor, TestApp};
use stocktrack_api::services::movements::RecordMovementInput;

/// Twenty concurrent OUT movements of one unit each against a balance of ten
/// must succeed exactly ten times and never drive the balance negative.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_outs_never_oversell() {
    let app = TestApp::new().await;
    let product = app.seed_product("CONC-1").await;
    let warehouse = app.seed_warehouse("Main").await;
    app.seed_stock(warehouse.id, product.id, 10).await;

    let mut handles = Vec::new();
    for _ in 0..20 {
        let movements = app.state.services.movements.clone();
        let product_id = product.id;
        let warehouse_id = warehouse.id;
        handles.push(tokio::spawn(async move {
            movements
                .record_movement(
                    &admin_actor(),
                    RecordMovementInput {
                        product_id,
                        movement_type: "OUT".to_string(),
                        quantity: 1,
                        source_warehouse_id: Some(warehouse_id.to_string()),
                        destination_warehouse_id: None,
                        reference: None,
                        description: None,
                    },
                )
                .await
        }));
    }

    let mut successes = 0;
    let mut insufficient = 0;
    for handle in handles {
        match handle.await.expect("movement task panicked") {
            Ok(_) => successes += 1,
            Err(stocktrack_api::errors::ServiceError::InsufficientStock(_)) => insufficient += 1,
            Err(other) => panic!("unexpected movement error: {other}"),
        }
    }

    assert_eq!(successes, 10);
    assert_eq!(insufficient, 10);

    let balance = app
        .state
        .services
        .stock
        .get_balance(warehouse.id, product.id)
        .await
        .expect("read balance");
    assert_eq!(balance, 0);

    // Ledger holds the seed IN plus exactly the successful OUTs
    let (_, total) = app
        .state
        .services
        .movements
        .list_movements(Default::default())
        .await
        .expect("list movements");
    assert_eq!(total, 11);
}

/// With stock for exactly one withdrawal, racing withdrawals succeed once.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn racing_withdrawals_for_the_last_unit_succeed_once() {
    let app = TestApp::new().await;
    let product = app.seed_product("CONC-3").await;
    let warehouse = app.seed_warehouse("Main").await;
    app.seed_stock(warehouse.id, product.id, 1).await;

    let mut handles = Vec::new();
    for _ in 0..5 {
        let movements = app.state.services.movements.clone();
        let product_id = product.id;
        let warehouse_id = warehouse.id;
        handles.push(tokio::spawn(async move {
            movements
                .record_movement(
                    &admin_actor(),
                    RecordMovementInput {
                        product_id,
                        movement_type: "OUT".to_string(),
                        quantity: 1,
                        source_warehouse_id: Some(warehouse_id.to_string()),
                        destination_warehouse_id: None,
                        reference: None,
                        description: None,
                    },
                )
                .await
        }));
    }

    let mut successes = 0;
    for handle in handles {
        if handle.await.expect("movement task panicked").is_ok() {
            successes += 1;
        }
    }

    assert_eq!(successes, 1);
    let balance = app
        .state
        .services
        .stock
        .get_balance(warehouse.id, product.id)
        .await
        .expect("read balance");
    assert_eq!(balance, 0);
}

/// First inbound movements for a brand-new (warehouse, product) pair all
/// succeed: the upsert lets one create the balance row and the rest
/// increment it, in any order.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_first_inbounds_all_land_on_one_row() {
    let app = TestApp::new().await;
    let product = app.seed_product("CONC-4").await;
    let warehouse = app.seed_warehouse("Main").await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let movements = app.state.services.movements.clone();
        let product_id = product.id;
        let warehouse_id = warehouse.id;
        handles.push(tokio::spawn(async move {
            movements
                .record_movement(
                    &admin_actor(),
                    RecordMovementInput {
                        product_id,
                        movement_type: "IN".to_string(),
                        quantity: 5,
                        source_warehouse_id: None,
                        destination_warehouse_id: Some(warehouse_id.to_string()),
                        reference: None,
                        description: None,
                    },
                )
                .await
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("inbound task panicked")
            .expect("inbound movement failed");
    }

    let balance = app
        .state
        .services
        .stock
        .get_balance(warehouse.id, product.id)
        .await
        .expect("read balance");
    assert_eq!(balance, 50);

    let (_, total) = app
        .state
        .services
        .movements
        .list_movements(Default::default())
        .await
        .expect("list movements");
    assert_eq!(total, 10);
}

/// Concurrent transfers between two warehouses conserve the product total.
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_transfers_conserve_the_total() {
    let app = TestApp::new().await;
    let product = app.seed_product("CONC-2").await;
    let source = app.seed_warehouse("Source").await;
    let destination = app.seed_warehouse("Destination").await;
    app.seed_stock(source.id, product.id, 50).await;

    let mut handles = Vec::new();
    for _ in 0..10 {
        let movements = app.state.services.movements.clone();
        let product_id = product.id;
        let source_id = source.id;
        let destination_id = destination.id;
        handles.push(tokio::spawn(async move {
            movements
                .record_movement(
                    &admin_actor(),
                    RecordMovementInput {
                        product_id,
                        movement_type: "TRANSFER".to_string(),
                        quantity: 5,
                        source_warehouse_id: Some(source_id.to_string()),
                        destination_warehouse_id: Some(destination_id.to_string()),
                        reference: None,
                        description: None,
                    },
                )
                .await
        }));
    }

    for handle in handles {
        handle
            .await
            .expect("transfer task panicked")
            .expect("transfer failed");
    }

    let stock = &app.state.services.stock;
    assert_eq!(stock.get_balance(source.id, product.id).await.unwrap(), 0);
    assert_eq!(
        stock.get_balance(destination.id, product.id).await.unwrap(),
        50
    );
    assert_eq!(stock.get_product_total(product.id).await.unwrap(), 50);
}
