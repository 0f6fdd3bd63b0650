use proptest::prelude::*;
use stocktrack_api::auth::RbacService;
use stocktrack_api::handlers::common::{PaginationMeta, PaginationParams};

proptest! {
    #[test]
    fn pagination_pages_cover_every_row(total in 0u64..100_000, per_page in 1u64..=100) {
        let meta = PaginationMeta::new(1, per_page, total);

        prop_assert!(meta.total_pages * per_page >= total);
        if meta.total_pages > 0 {
            prop_assert!((meta.total_pages - 1) * per_page < total);
        } else {
            prop_assert_eq!(total, 0);
        }
    }

    #[test]
    fn consecutive_pages_never_overlap(page in 1u64..10_000, per_page in 0u64..10_000) {
        let current = PaginationParams { page, per_page };
        let next = PaginationParams { page: page + 1, per_page };

        // The clamped limit is what separates one page from the next
        prop_assert_eq!(next.offset() - current.offset(), current.limit());
        prop_assert!(current.limit() >= 1 && current.limit() <= 100);
    }

    #[test]
    fn wildcard_permissions_cover_their_namespace(action in "[a-z]{1,12}") {
        let rbac = RbacService::new();
        let required = format!("catalog:{}", action);

        prop_assert!(rbac.check_permission("catalog:*", &required));
        prop_assert!(!rbac.check_permission("stock:*", &required));
    }
}
