//! Integration tests for the Purchase aggregate: totals math, stock
//! receipts, status transitions, and line edits, all against an in-memory
//! SQLite database.

mod common;

use common::{external_id, seed_product, stock_of, test_db};
use teocat_core::{Product, PurchaseStatus};
use teocat_db::service::purchase::{CreatePurchase, PurchaseLineInput, UpdatePurchase};
use teocat_db::{ErrorCode, PurchaseService};

fn one_line(product_id: &str, quantity: i64, unit_price_cents: i64) -> CreatePurchase {
    CreatePurchase {
        supplier_id: external_id(),
        purchase_date: None,
        lines: vec![PurchaseLineInput {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents,
        }],
    }
}

#[tokio::test]
async fn create_purchase_computes_line_and_header_totals() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo para gatos", 10_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    // 10 units at $100.00 with 19% tax
    let created = service.create(one_line(&product.id, 10, 10_000)).await.unwrap();

    let item = &created.items[0];
    assert_eq!(item.subtotal_cents, 100_000);
    assert_eq!(item.unit_tax_cents, 1_900);
    assert_eq!(item.total_cents, 119_000);

    assert_eq!(created.purchase.subtotal_cents, 100_000);
    assert_eq!(created.purchase.tax_cents, 19_000);
    assert_eq!(created.purchase.total_cents, 119_000);
    assert_eq!(created.purchase.status, PurchaseStatus::Effective);

    assert_eq!(stock_of(&db, &product.id).await, 10);
}

#[tokio::test]
async fn untaxed_product_carries_no_tax() {
    let db = test_db().await;
    let product = seed_product(&db, "Juguete", 5_000, 0, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 2, 5_000)).await.unwrap();

    assert_eq!(created.purchase.subtotal_cents, 10_000);
    assert_eq!(created.purchase.tax_cents, 0);
    assert_eq!(created.purchase.total_cents, 10_000);
}

#[tokio::test]
async fn header_totals_equal_sum_of_lines() {
    let db = test_db().await;
    let a = seed_product(&db, "Arena", 3_000, 1900, 0).await;
    let b = seed_product(&db, "Correa", 7_500, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service
        .create(CreatePurchase {
            supplier_id: external_id(),
            purchase_date: None,
            lines: vec![
                PurchaseLineInput {
                    product_id: a.id.clone(),
                    quantity: 3,
                    unit_price_cents: 3_000,
                },
                PurchaseLineInput {
                    product_id: b.id.clone(),
                    quantity: 2,
                    unit_price_cents: 7_500,
                },
            ],
        })
        .await
        .unwrap();

    let subtotal: i64 = created.items.iter().map(|i| i.subtotal_cents).sum();
    let total: i64 = created.items.iter().map(|i| i.total_cents).sum();
    assert_eq!(created.purchase.subtotal_cents, subtotal);
    assert_eq!(created.purchase.total_cents, total);
    assert_eq!(
        created.purchase.tax_cents,
        created.purchase.total_cents - created.purchase.subtotal_cents
    );
}

#[tokio::test]
async fn create_rejects_empty_line_list() {
    let db = test_db().await;
    let service = PurchaseService::new(db.clone());

    let err = service
        .create(CreatePurchase {
            supplier_id: external_id(),
            purchase_date: None,
            lines: vec![],
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn create_rejects_nonpositive_quantity() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let err = service.create(one_line(&product.id, 0, 2_000)).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(stock_of(&db, &product.id).await, 0);
}

#[tokio::test]
async fn create_rejects_unknown_product_and_rolls_back() {
    let db = test_db().await;
    let known = seed_product(&db, "Pienso", 4_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let err = service
        .create(CreatePurchase {
            supplier_id: external_id(),
            purchase_date: None,
            lines: vec![
                PurchaseLineInput {
                    product_id: known.id.clone(),
                    quantity: 5,
                    unit_price_cents: 4_000,
                },
                PurchaseLineInput {
                    product_id: "no-such-product".to_string(),
                    quantity: 1,
                    unit_price_cents: 1_000,
                },
            ],
        })
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::NotFound);
    // First line must not have leaked through.
    assert_eq!(stock_of(&db, &known.id).await, 0);
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_reverses_stock_and_reactivate_reapplies() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 10, 10_000)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 10);

    let cancelled = service
        .set_status(&created.purchase.id, PurchaseStatus::Cancelled)
        .await
        .unwrap();
    assert_eq!(cancelled.status, PurchaseStatus::Cancelled);
    assert_eq!(stock_of(&db, &product.id).await, 0);

    let reactivated = service
        .set_status(&created.purchase.id, PurchaseStatus::Effective)
        .await
        .unwrap();
    assert_eq!(reactivated.status, PurchaseStatus::Effective);
    assert_eq!(stock_of(&db, &product.id).await, 10);
}

#[tokio::test]
async fn cancel_clamps_at_zero_when_stock_drifted() {
    let db = test_db().await;
    let product = seed_product(&db, "Arena premium", 6_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 10, 6_000)).await.unwrap();

    // Simulate intervening consumption leaving less than the receipt.
    let mut tx = db.begin().await.unwrap();
    db.products()
        .apply_stock_delta(&mut tx, &product.id, -8)
        .await
        .unwrap();
    tx.commit().await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 2);

    service
        .set_status(&created.purchase.id, PurchaseStatus::Cancelled)
        .await
        .unwrap();

    // MAX(0, 2 - 10), never negative.
    assert_eq!(stock_of(&db, &product.id).await, 0);
}

#[tokio::test]
async fn same_status_transition_is_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, "Correa", 7_500, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 1, 7_500)).await.unwrap();

    let err = service
        .set_status(&created.purchase.id, PurchaseStatus::Effective)
        .await
        .unwrap_err();

    assert_eq!(err.code, ErrorCode::BusinessRule);
    assert_eq!(stock_of(&db, &product.id).await, 1);
}

#[tokio::test]
async fn replace_lines_compensates_stock() {
    let db = test_db().await;
    let product = seed_product(&db, "Pienso", 4_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 10, 4_000)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 10);

    let updated = service
        .update(
            &created.purchase.id,
            UpdatePurchase {
                supplier_id: None,
                purchase_date: None,
                lines: Some(vec![PurchaseLineInput {
                    product_id: product.id.clone(),
                    quantity: 4,
                    unit_price_cents: 4_000,
                }]),
            },
        )
        .await
        .unwrap();

    // Old receipt reversed, new one applied.
    assert_eq!(stock_of(&db, &product.id).await, 4);
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.purchase.subtotal_cents, 16_000);
}

#[tokio::test]
async fn add_update_and_remove_line_keep_stock_and_totals_consistent() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 2, 10_000)).await.unwrap();
    let purchase_id = created.purchase.id.clone();
    assert_eq!(stock_of(&db, &product.id).await, 2);

    // Add a second line.
    let after_add = service
        .add_line(
            &purchase_id,
            PurchaseLineInput {
                product_id: product.id.clone(),
                quantity: 3,
                unit_price_cents: 10_000,
            },
        )
        .await
        .unwrap();
    assert_eq!(after_add.items.len(), 2);
    assert_eq!(stock_of(&db, &product.id).await, 5);
    assert_eq!(after_add.purchase.subtotal_cents, 50_000);

    // Replace the second line with a smaller quantity; the line id stays.
    let second_id = after_add.items[1].id.clone();
    let after_update = service
        .update_line(
            &purchase_id,
            &second_id,
            PurchaseLineInput {
                product_id: product.id.clone(),
                quantity: 1,
                unit_price_cents: 10_000,
            },
        )
        .await
        .unwrap();
    assert!(after_update.items.iter().any(|i| i.id == second_id));
    assert_eq!(stock_of(&db, &product.id).await, 3);
    assert_eq!(after_update.purchase.subtotal_cents, 30_000);

    // Remove it again.
    let after_remove = service.remove_line(&purchase_id, &second_id).await.unwrap();
    assert_eq!(after_remove.items.len(), 1);
    assert_eq!(stock_of(&db, &product.id).await, 2);
    assert_eq!(after_remove.purchase.subtotal_cents, 20_000);
    assert_eq!(
        after_remove.purchase.total_cents,
        after_remove.purchase.subtotal_cents + after_remove.purchase.tax_cents
    );
}

#[tokio::test]
async fn delete_reverses_stock_and_removes_lines() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let created = service.create(one_line(&product.id, 6, 2_000)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 6);

    service.delete(&created.purchase.id).await.unwrap();

    assert_eq!(stock_of(&db, &product.id).await, 0);
    let err = service.get(&created.purchase.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn list_by_supplier_filters() {
    let db = test_db().await;
    let product = seed_product(&db, "Arena", 3_000, 1900, 0).await;
    let service = PurchaseService::new(db.clone());

    let supplier = external_id();
    let mut req = one_line(&product.id, 1, 3_000);
    req.supplier_id = supplier.clone();
    service.create(req).await.unwrap();
    service.create(one_line(&product.id, 1, 3_000)).await.unwrap();

    let mine = service.list_by_supplier(&supplier).await.unwrap();
    assert_eq!(mine.len(), 1);
    assert_eq!(service.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn retired_products_are_hidden_and_unpurchasable() {
    let db = test_db().await;
    let active = seed_product(&db, "Collar", 5_000, 1900, 3).await;

    let retired = Product {
        id: external_id(),
        name: "Descontinuado".to_string(),
        is_active: false,
        ..active.clone()
    };
    db.products().insert(&retired).await.unwrap();

    let listed = db.products().list_active(10).await.unwrap();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].id, active.id);

    // A purchase cannot receive stock into a retired product.
    let service = PurchaseService::new(db.clone());
    let err = service
        .create(one_line(&retired.id, 1, 5_000))
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}
