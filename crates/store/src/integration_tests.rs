//! Integration tests for the stock-adjustment protocol.
//!
//! Run against the in-memory store, which implements the same atomicity and
//! serialisation contract as the Postgres store; the ledger arithmetic under
//! test is shared between the two implementations.

use stockroom_catalog::{PatchFields, ProductDraft, ProductFields, ProductPatch};
use stockroom_core::{DomainError, MovementId, ProductId};
use stockroom_ledger::{MovementType, RecordMovement};

use crate::error::StoreError;
use crate::in_memory::InMemoryInventoryStore;
use crate::r#trait::InventoryStore;

fn draft(name: &str, stock: i64) -> ProductDraft {
    ProductDraft::new(ProductFields {
        name: name.to_string(),
        stock,
        ..ProductFields::default()
    })
    .unwrap()
}

async fn seed_product(store: &InMemoryInventoryStore, name: &str, stock: i64) -> ProductId {
    store.create_product(draft(name, stock)).await.unwrap().id
}

fn record(product_id: ProductId, movement_type: MovementType, qty: i64) -> RecordMovement {
    RecordMovement::new(product_id, movement_type, qty, None).unwrap()
}

fn assert_invariant_violation(err: StoreError) {
    match err {
        StoreError::Domain(DomainError::InvariantViolation(_)) => {}
        other => panic!("expected invariant violation, got {other:?}"),
    }
}

#[tokio::test]
async fn recording_a_movement_adjusts_stock_and_persists_the_row() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 0).await;

    let movement = store
        .record_movement(
            RecordMovement::new(
                product_id,
                MovementType::In,
                5,
                Some("initial delivery".to_string()),
            )
            .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(movement.product_id, product_id);
    assert_eq!(movement.movement_type, MovementType::In);
    assert_eq!(movement.qty, 5);
    assert_eq!(movement.reason.as_deref(), Some("initial delivery"));

    let product = store.get_product(product_id).await.unwrap().unwrap();
    assert_eq!(product.stock, 5);

    let history = store.list_movements(None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movement.id, movement.id);
    assert_eq!(history[0].product_name, "Widget");
}

#[tokio::test]
async fn failed_movement_leaves_product_and_history_untouched() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 10).await;
    let before = store.get_product(product_id).await.unwrap().unwrap();

    let err = store
        .record_movement(record(product_id, MovementType::Out, 12))
        .await
        .unwrap_err();
    assert_invariant_violation(err);

    // Snapshot comparison: no partial write survives the failed transaction.
    let after = store.get_product(product_id).await.unwrap().unwrap();
    assert_eq!(after, before);
    assert!(store.list_movements(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn movement_against_missing_product_is_not_found() {
    let store = InMemoryInventoryStore::new();
    let err = store
        .record_movement(record(ProductId::new(), MovementType::In, 1))
        .await
        .unwrap_err();
    match err {
        StoreError::Domain(DomainError::NotFound) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn immediate_reversal_restores_stock_and_deletes_the_row() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 3).await;

    let movement = store
        .record_movement(record(product_id, MovementType::In, 5))
        .await
        .unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        8
    );

    store.reverse_movement(movement.id).await.unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        3
    );
    assert!(store.list_movements(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn reversing_an_in_fails_when_later_movements_consumed_the_stock() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 0).await;

    let inbound = store
        .record_movement(record(product_id, MovementType::In, 10))
        .await
        .unwrap();
    store
        .record_movement(record(product_id, MovementType::Out, 8))
        .await
        .unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        2
    );

    // Undoing the IN would need 10 back out of a stock of 2.
    let err = store.reverse_movement(inbound.id).await.unwrap_err();
    assert_invariant_violation(err);

    // The failed reversal changed nothing.
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        2
    );
    assert_eq!(store.list_movements(None).await.unwrap().len(), 2);
}

#[tokio::test]
async fn reversal_order_determines_the_outcome() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 0).await;

    let inbound = store
        .record_movement(record(product_id, MovementType::In, 5))
        .await
        .unwrap();
    let outbound = store
        .record_movement(record(product_id, MovementType::Out, 3))
        .await
        .unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        2
    );

    // Newest first succeeds: undo the OUT (2 → 5), then the IN (5 → 0).
    store.reverse_movement(outbound.id).await.unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        5
    );
    store.reverse_movement(inbound.id).await.unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        0
    );
}

#[tokio::test]
async fn out_movement_protocol_end_to_end() {
    // stock=10: OUT 12 rejected, OUT 10 drains to zero, reversal restores.
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 10).await;

    let err = store
        .record_movement(record(product_id, MovementType::Out, 12))
        .await
        .unwrap_err();
    assert_invariant_violation(err);
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        10
    );

    let movement = store
        .record_movement(record(product_id, MovementType::Out, 10))
        .await
        .unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        0
    );
    let history = store.list_movements(None).await.unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].movement.movement_type, MovementType::Out);
    assert_eq!(history[0].movement.qty, 10);

    store.reverse_movement(movement.id).await.unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        10
    );
    assert!(store.list_movements(None).await.unwrap().is_empty());
}

#[tokio::test]
async fn reversing_a_missing_movement_is_not_found() {
    let store = InMemoryInventoryStore::new();
    let err = store.reverse_movement(MovementId::new()).await.unwrap_err();
    match err {
        StoreError::Domain(DomainError::NotFound) => {}
        other => panic!("expected NotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn deleting_a_product_is_blocked_while_movements_exist() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 0).await;

    let movement = store
        .record_movement(record(product_id, MovementType::In, 2))
        .await
        .unwrap();

    let err = store.delete_product(product_id).await.unwrap_err();
    match err {
        StoreError::Domain(DomainError::Conflict(_)) => {}
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Once the history is reversed away the product can go.
    store.reverse_movement(movement.id).await.unwrap();
    store.delete_product(product_id).await.unwrap();
    assert!(store.get_product(product_id).await.unwrap().is_none());
}

#[tokio::test]
async fn catalog_edit_can_correct_stock_directly() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 5).await;

    let patch = ProductPatch::new(PatchFields {
        stock: Some(42),
        ..PatchFields::default()
    })
    .unwrap();
    let updated = store.update_product(product_id, patch).await.unwrap();
    assert_eq!(updated.stock, 42);

    // The ledger sees the corrected counter.
    store
        .record_movement(record(product_id, MovementType::Out, 42))
        .await
        .unwrap();
    assert_eq!(
        store.get_product(product_id).await.unwrap().unwrap().stock,
        0
    );
}

#[tokio::test]
async fn movement_history_filters_by_type_and_orders_newest_first() {
    let store = InMemoryInventoryStore::new();
    let product_id = seed_product(&store, "Widget", 0).await;

    store
        .record_movement(record(product_id, MovementType::In, 4))
        .await
        .unwrap();
    store
        .record_movement(record(product_id, MovementType::Out, 1))
        .await
        .unwrap();
    store
        .record_movement(record(product_id, MovementType::In, 2))
        .await
        .unwrap();

    let all = store.list_movements(None).await.unwrap();
    assert_eq!(all.len(), 3);
    assert!(all
        .windows(2)
        .all(|w| w[0].movement.created_at >= w[1].movement.created_at));

    let inbound = store.list_movements(Some(MovementType::In)).await.unwrap();
    assert_eq!(inbound.len(), 2);
    assert!(inbound
        .iter()
        .all(|m| m.movement.movement_type == MovementType::In));

    let recent = store.recent_movements(2).await.unwrap();
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].movement.qty, 2);
}

#[tokio::test]
async fn search_matches_each_field_case_insensitively() {
    let store = InMemoryInventoryStore::new();
    store
        .create_product(
            ProductDraft::new(ProductFields {
                name: "Hammer".to_string(),
                sku: Some("TL-HAM".to_string()),
                category: Some("Tools".to_string()),
                description: Some("Claw hammer with wooden handle".to_string()),
                ..ProductFields::default()
            })
            .unwrap(),
        )
        .await
        .unwrap();
    store
        .create_product(
            ProductDraft::new(ProductFields {
                name: "Apron".to_string(),
                ..ProductFields::default()
            })
            .unwrap(),
        )
        .await
        .unwrap();

    for query in ["hammer", "tl-ham", "tools", "wooden"] {
        let hits = store.search_products(query).await.unwrap();
        assert_eq!(hits.len(), 1, "query {query:?}");
        assert_eq!(hits[0].name, "Hammer");
    }

    // Blank query returns the whole catalog, ordered by name.
    let all = store.search_products("  ").await.unwrap();
    assert_eq!(all.len(), 2);
    assert_eq!(all[0].name, "Apron");
}

#[tokio::test]
async fn dashboard_summary_reflects_ledger_activity() {
    let store = InMemoryInventoryStore::new();
    let first = seed_product(&store, "Widget", 3).await;
    seed_product(&store, "Gadget", 4).await;

    store
        .record_movement(record(first, MovementType::In, 5))
        .await
        .unwrap();

    let summary = store.dashboard_summary().await.unwrap();
    assert_eq!(summary.total_products, 2);
    assert_eq!(summary.total_stock, 12);
    assert_eq!(summary.recent_movements.len(), 1);
    assert_eq!(summary.recent_movements[0].product_name, "Widget");
}
