use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{error, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone)]
pub struct EventSender {
    sender: mpsc::Sender<Event>,
}

impl EventSender {
    /// Creates a new EventSender
    pub fn new(sender: mpsc::Sender<Event>) -> Self {
        Self { sender }
    }

    /// Sends an event asynchronously
    pub async fn send(&self, event: Event) -> Result<(), String> {
        self.sender
            .send(event)
            .await
            .map_err(|e| format!("Failed to send event: {}", e))
    }

    /// Sends an event, logging instead of failing when the consumer is gone.
    /// Event delivery never fails the originating request.
    pub async fn send_or_log(&self, event: Event) {
        if let Err(e) = self.send(event).await {
            warn!("Event dropped: {}", e);
        }
    }
}

// The events emitted by the catalog, user and movement services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    // Catalog events
    ProductCreated(Uuid),
    ProductUpdated(Uuid),
    ProductDeleted(Uuid),
    WarehouseCreated(Uuid),
    WarehouseUpdated(Uuid),
    WarehouseDeleted(Uuid),

    // Movement ledger events
    StockMoved {
        movement_id: Uuid,
        movement_type: String,
        product_id: Uuid,
        source_warehouse_id: Option<Uuid>,
        destination_warehouse_id: Option<Uuid>,
        quantity: i32,
    },

    // User events
    UserCreated(Uuid),
    UserUpdated(Uuid),
}

// Consumes events from the channel and dispatches them to handlers.
pub async fn process_events(mut rx: mpsc::Receiver<Event>) {
    info!("Starting event processing loop");

    while let Some(event) = rx.recv().await {
        match event {
            Event::StockMoved {
                movement_id,
                ref movement_type,
                product_id,
                source_warehouse_id,
                destination_warehouse_id,
                quantity,
            } => {
                if let Err(e) = handle_stock_moved(
                    movement_id,
                    movement_type,
                    product_id,
                    source_warehouse_id,
                    destination_warehouse_id,
                    quantity,
                )
                .await
                {
                    error!(
                        "Failed to handle stock moved event: movement_id={}, error={}",
                        movement_id, e
                    );
                }
            }
            Event::ProductCreated(product_id) => {
                info!("Product created: {}", product_id);
            }
            Event::ProductUpdated(product_id) => {
                info!("Product updated: {}", product_id);
            }
            Event::ProductDeleted(product_id) => {
                info!("Product deleted: {}", product_id);
            }
            Event::WarehouseCreated(warehouse_id) => {
                info!("Warehouse created: {}", warehouse_id);
            }
            Event::WarehouseUpdated(warehouse_id) => {
                info!("Warehouse updated: {}", warehouse_id);
            }
            Event::WarehouseDeleted(warehouse_id) => {
                info!("Warehouse deleted: {}", warehouse_id);
            }
            Event::UserCreated(user_id) => {
                info!("User created: {}", user_id);
            }
            Event::UserUpdated(user_id) => {
                info!("User updated: {}", user_id);
            }
        }
    }

    warn!("Event processing loop has ended");
}

async fn handle_stock_moved(
    movement_id: Uuid,
    movement_type: &str,
    product_id: Uuid,
    source_warehouse_id: Option<Uuid>,
    destination_warehouse_id: Option<Uuid>,
    quantity: i32,
) -> Result<(), String> {
    info!(
        "Processing stock movement {}: type={}, product={}, quantity={}",
        movement_id, movement_type, product_id, quantity
    );

    if let Some(source) = source_warehouse_id {
        info!("Stock left warehouse {}", source);
    }
    if let Some(destination) = destination_warehouse_id {
        info!("Stock arrived at warehouse {}", destination);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn send_or_log_does_not_fail_when_receiver_dropped() {
        let (tx, rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        drop(rx);

        // Must not panic or return an error to the caller
        sender.send_or_log(Event::ProductCreated(Uuid::new_v4())).await;
    }

    #[tokio::test]
    async fn events_round_trip_through_the_channel() {
        let (tx, mut rx) = mpsc::channel(4);
        let sender = EventSender::new(tx);
        let id = Uuid::new_v4();

        sender.send(Event::WarehouseCreated(id)).await.unwrap();
        match rx.recv().await {
            Some(Event::WarehouseCreated(got)) => assert_eq!(got, id),
            other => panic!("unexpected event: {:?}", other),
        }
    }
}
