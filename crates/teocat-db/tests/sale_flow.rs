//! Integration tests for the Sale aggregate: conditional stock decrements,
//! returns, cancellations, the status state machine, and mixed
//! product/service totals, against an in-memory SQLite database.

mod common;

use common::{external_id, seed_product, stock_of, test_db};
use teocat_core::{SaleKind, SaleStatus};
use teocat_db::service::sale::{CreateSale, SaleLineInput, ServiceLineInput};
use teocat_db::{ErrorCode, SaleService};

fn sale_request(product_id: &str, quantity: i64) -> CreateSale {
    CreateSale {
        customer_id: external_id(),
        staff_id: external_id(),
        sale_date: None,
        status: None,
        kind: None,
        original_sale_id: None,
        notes: None,
        product_lines: vec![SaleLineInput {
            product_id: product_id.to_string(),
            quantity,
            unit_price_cents: None,
        }],
        service_lines: vec![],
    }
}

#[tokio::test]
async fn sale_decrements_stock_and_computes_totals() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo para gatos", 10_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 10)).await.unwrap();

    let item = &created.items[0];
    assert_eq!(item.unit_price_cents, 10_000);
    assert_eq!(item.subtotal_cents, 100_000);
    assert_eq!(item.unit_tax_cents, 1_900);
    assert_eq!(item.total_cents, 119_000);

    assert_eq!(created.sale.subtotal_cents, 100_000);
    assert_eq!(created.sale.tax_cents, 19_000);
    assert_eq!(created.sale.total_cents, 119_000);
    assert_eq!(created.sale.kind, SaleKind::Sale);
    assert_eq!(created.sale.status, SaleStatus::Effective);

    assert_eq!(stock_of(&db, &product.id).await, 0);
}

#[tokio::test]
async fn exact_stock_boundary_sells_out_then_rejects() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 3).await;
    let service = SaleService::new(db.clone());

    // Selling exactly the available stock succeeds.
    service.create(sale_request(&product.id, 3)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 0);

    // One more unit is a rejection, not a clamp.
    let err = service.create(sale_request(&product.id, 1)).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);
    assert!(err.message.starts_with("Stock insuficiente"));

    assert_eq!(stock_of(&db, &product.id).await, 0);
    assert_eq!(service.list().await.unwrap().len(), 1);
}

#[tokio::test]
async fn short_line_rolls_back_whole_sale() {
    let db = test_db().await;
    let plenty = seed_product(&db, "Arena", 3_000, 1900, 100).await;
    let short = seed_product(&db, "Correa", 7_500, 1900, 1).await;
    let service = SaleService::new(db.clone());

    let mut req = sale_request(&plenty.id, 5);
    req.product_lines.push(SaleLineInput {
        product_id: short.id.clone(),
        quantity: 2,
        unit_price_cents: None,
    });

    let err = service.create(req).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    // The first line's decrement must not survive the rollback.
    assert_eq!(stock_of(&db, &plenty.id).await, 100);
    assert_eq!(stock_of(&db, &short.id).await, 1);
    assert!(service.list().await.unwrap().is_empty());
}

#[tokio::test]
async fn cancel_restores_stock_and_failed_reactivation_leaves_state() {
    let db = test_db().await;
    let product = seed_product(&db, "Pienso", 4_000, 1900, 7).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 5)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 2);

    let cancelled = service.cancel(&created.sale.id).await.unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelled);
    assert_eq!(stock_of(&db, &product.id).await, 7);

    // Drain the shelf below the sale's quantity.
    service.create(sale_request(&product.id, 6)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 1);

    // Reactivation needs 5 units but only 1 remains.
    let err = service
        .set_status(&created.sale.id, SaleStatus::Effective)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    // Nothing moved, nothing flipped.
    assert_eq!(stock_of(&db, &product.id).await, 1);
    let unchanged = service.get(&created.sale.id).await.unwrap();
    assert_eq!(unchanged.sale.status, SaleStatus::Cancelled);
}

#[tokio::test]
async fn double_cancel_and_cancel_of_returned_are_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let first = service.create(sale_request(&product.id, 1)).await.unwrap();
    service.cancel(&first.sale.id).await.unwrap();
    let err = service.cancel(&first.sale.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);

    let second = service.create(sale_request(&product.id, 1)).await.unwrap();
    service.return_sale(&second.sale.id).await.unwrap();
    let err = service.cancel(&second.sale.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);
}

#[tokio::test]
async fn return_flips_original_and_restores_stock() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 5).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 2)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 3);

    let outcome = service.return_sale(&created.sale.id).await.unwrap();

    assert_eq!(outcome.original.status, SaleStatus::Returned);
    assert_eq!(outcome.return_sale.sale.kind, SaleKind::Return);
    assert_eq!(
        outcome.return_sale.sale.original_sale_id.as_deref(),
        Some(created.sale.id.as_str())
    );

    // Lines copied 1:1, goods back on the shelf.
    assert_eq!(outcome.return_sale.items.len(), 1);
    assert_eq!(outcome.return_sale.items[0].quantity, 2);
    assert_eq!(outcome.return_sale.sale.total_cents, created.sale.total_cents);
    assert_eq!(stock_of(&db, &product.id).await, 5);

    // The return row is findable from the original.
    let returns = db.sales().list_returns_of(&created.sale.id).await.unwrap();
    assert_eq!(returns.len(), 1);
    assert_eq!(returns[0].id, outcome.return_sale.sale.id);
}

#[tokio::test]
async fn cancelling_return_restores_original_to_effective() {
    let db = test_db().await;
    let product = seed_product(&db, "Arena", 3_000, 1900, 4).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 3)).await.unwrap();
    let outcome = service.return_sale(&created.sale.id).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 4);

    let cancelled = service.cancel(&outcome.return_sale.sale.id).await.unwrap();
    assert_eq!(cancelled.status, SaleStatus::Cancelled);

    // Return's increment reversed, original effective again.
    assert_eq!(stock_of(&db, &product.id).await, 1);
    let original = service.get(&created.sale.id).await.unwrap();
    assert_eq!(original.sale.status, SaleStatus::Effective);
}

#[tokio::test]
async fn return_of_return_is_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, "Correa", 7_500, 1900, 2).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 1)).await.unwrap();
    let outcome = service.return_sale(&created.sale.id).await.unwrap();

    let err = service
        .return_sale(&outcome.return_sale.sale.id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);
    assert_eq!(
        err.message,
        "No se puede hacer una devolución de otra devolución"
    );
}

#[tokio::test]
async fn returning_non_effective_sale_is_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, "Pienso", 4_000, 1900, 5).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 1)).await.unwrap();
    service.cancel(&created.sale.id).await.unwrap();

    let err = service.return_sale(&created.sale.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);
    assert!(err.message.contains("Cancelada"));
}

#[tokio::test]
async fn pending_sale_moves_no_stock_until_effective() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 5).await;
    let service = SaleService::new(db.clone());

    let mut req = sale_request(&product.id, 3);
    req.status = Some(SaleStatus::Pending);
    let created = service.create(req).await.unwrap();

    assert_eq!(created.sale.status, SaleStatus::Pending);
    assert_eq!(stock_of(&db, &product.id).await, 5);

    // Confirming the sale performs the conditional decrement.
    let confirmed = service
        .set_status(&created.sale.id, SaleStatus::Effective)
        .await
        .unwrap();
    assert_eq!(confirmed.status, SaleStatus::Effective);
    assert_eq!(stock_of(&db, &product.id).await, 2);

    // And back to Pendiente releases it.
    service
        .set_status(&created.sale.id, SaleStatus::Pending)
        .await
        .unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 5);
}

#[tokio::test]
async fn mixed_product_and_service_totals() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let mut req = sale_request(&product.id, 1);
    req.service_lines = vec![ServiceLineInput {
        service_id: external_id(),
        pet_id: external_id(),
        quantity: 2,
        unit_price_cents: 5_000,
    }];

    let created = service.create(req).await.unwrap();

    // Product: 10 000 subtotal + 1 900 tax. Services: 10 000, untaxed.
    assert_eq!(created.sale.subtotal_cents, 20_000);
    assert_eq!(created.sale.tax_cents, 1_900);
    assert_eq!(created.sale.total_cents, 21_900);
    assert_eq!(created.service_items.len(), 1);
    assert_eq!(created.service_items[0].subtotal_cents, 10_000);
}

#[tokio::test]
async fn service_only_sale_is_allowed_and_untaxed() {
    let db = test_db().await;
    let service = SaleService::new(db.clone());

    let created = service
        .create(CreateSale {
            customer_id: external_id(),
            staff_id: external_id(),
            sale_date: None,
            status: None,
            kind: None,
            original_sale_id: None,
            notes: None,
            product_lines: vec![],
            service_lines: vec![ServiceLineInput {
                service_id: external_id(),
                pet_id: external_id(),
                quantity: 1,
                unit_price_cents: 8_000,
            }],
        })
        .await
        .unwrap();

    assert_eq!(created.sale.subtotal_cents, 8_000);
    assert_eq!(created.sale.tax_cents, 0);
    assert_eq!(created.sale.total_cents, 8_000);
}

#[tokio::test]
async fn create_rejects_missing_lines_and_bad_ids() {
    let db = test_db().await;
    let service = SaleService::new(db.clone());

    let err = service
        .create(CreateSale {
            customer_id: external_id(),
            staff_id: external_id(),
            sale_date: None,
            status: None,
            kind: None,
            original_sale_id: None,
            notes: None,
            product_lines: vec![],
            service_lines: vec![],
        })
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);

    let product = seed_product(&db, "Collar", 2_000, 1900, 5).await;
    let mut req = sale_request(&product.id, 1);
    req.customer_id = "no-es-uuid".to_string();
    let err = service.create(req).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::ValidationError);
}

#[tokio::test]
async fn return_kind_requires_original_reference() {
    let db = test_db().await;
    let product = seed_product(&db, "Arena", 3_000, 1900, 5).await;
    let service = SaleService::new(db.clone());

    let mut req = sale_request(&product.id, 1);
    req.kind = Some(SaleKind::Return);
    let err = service.create(req).await.unwrap_err();

    assert_eq!(err.code, ErrorCode::ValidationError);
    assert_eq!(
        err.message,
        "Para una devolución, se requiere el ID de la venta original"
    );
}

#[tokio::test]
async fn add_and_remove_product_line_adjust_stock_and_totals() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 2)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 8);

    let after_add = service
        .add_product_line(
            &created.sale.id,
            SaleLineInput {
                product_id: product.id.clone(),
                quantity: 3,
                unit_price_cents: None,
            },
        )
        .await
        .unwrap();
    assert_eq!(after_add.items.len(), 2);
    assert_eq!(stock_of(&db, &product.id).await, 5);
    assert_eq!(after_add.sale.subtotal_cents, 50_000);

    let second_id = after_add.items[1].id.clone();
    let after_remove = service
        .remove_product_line(&created.sale.id, &second_id)
        .await
        .unwrap();
    assert_eq!(after_remove.items.len(), 1);
    assert_eq!(stock_of(&db, &product.id).await, 8);
    assert_eq!(after_remove.sale.subtotal_cents, 20_000);
}

#[tokio::test]
async fn delete_effective_sale_restores_stock() {
    let db = test_db().await;
    let product = seed_product(&db, "Pienso", 4_000, 1900, 6).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 4)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 2);

    service.delete(&created.sale.id).await.unwrap();

    assert_eq!(stock_of(&db, &product.id).await, 6);
    let err = service.get(&created.sale.id).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}

#[tokio::test]
async fn date_range_listing_is_inclusive_of_closing_day() {
    let db = test_db().await;
    let product = seed_product(&db, "Arena", 3_000, 1900, 30).await;
    let service = SaleService::new(db.clone());

    for date in ["2026-01-05", "2026-01-31", "2026-02-01"] {
        let mut req = sale_request(&product.id, 1);
        req.sale_date = Some(date.to_string());
        service.create(req).await.unwrap();
    }

    let january = service
        .list_by_date_range("2026-01-01", "2026-01-31")
        .await
        .unwrap();
    assert_eq!(january.len(), 2);

    let all = service
        .list_by_date_range("2026-01-01", "2026-02-01")
        .await
        .unwrap();
    assert_eq!(all.len(), 3);
}

#[tokio::test]
async fn list_filters_by_customer_and_staff() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let customer = external_id();
    let staff = external_id();

    let mut req = sale_request(&product.id, 1);
    req.customer_id = customer.clone();
    req.staff_id = staff.clone();
    service.create(req).await.unwrap();
    service.create(sale_request(&product.id, 1)).await.unwrap();

    assert_eq!(service.list_by_customer(&customer).await.unwrap().len(), 1);
    assert_eq!(service.list_by_staff(&staff).await.unwrap().len(), 1);
    assert_eq!(service.list().await.unwrap().len(), 2);
}

#[tokio::test]
async fn sale_cannot_be_created_in_a_terminal_status() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    // Devuelta without any return row would corrupt the state machine.
    let mut req = sale_request(&product.id, 1);
    req.status = Some(SaleStatus::Returned);
    let err = service.create(req).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);

    let mut req = sale_request(&product.id, 1);
    req.status = Some(SaleStatus::Cancelled);
    let err = service.create(req).await.unwrap_err();
    assert_eq!(err.code, ErrorCode::BusinessRule);

    // Nothing committed, nothing moved.
    assert!(service.list().await.unwrap().is_empty());
    assert_eq!(stock_of(&db, &product.id).await, 10);
}

#[tokio::test]
async fn update_product_line_compensates_stock_and_keeps_line_id() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 3)).await.unwrap();
    assert_eq!(stock_of(&db, &product.id).await, 7);
    let item_id = created.items[0].id.clone();

    let updated = service
        .update_product_line(
            &created.sale.id,
            &item_id,
            SaleLineInput {
                product_id: product.id.clone(),
                quantity: 5,
                unit_price_cents: None,
            },
        )
        .await
        .unwrap();

    // 3 back, 5 out again.
    assert_eq!(stock_of(&db, &product.id).await, 5);
    assert_eq!(updated.items.len(), 1);
    assert_eq!(updated.items[0].id, item_id);
    assert_eq!(updated.items[0].quantity, 5);
    assert_eq!(updated.sale.subtotal_cents, 50_000);
    assert_eq!(updated.sale.total_cents, 59_500);
}

#[tokio::test]
async fn short_product_line_update_rolls_back() {
    let db = test_db().await;
    let product = seed_product(&db, "Arena", 3_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 3)).await.unwrap();
    let item_id = created.items[0].id.clone();

    let err = service
        .update_product_line(
            &created.sale.id,
            &item_id,
            SaleLineInput {
                product_id: product.id.clone(),
                quantity: 100,
                unit_price_cents: None,
            },
        )
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::InsufficientStock);

    // The old line and its stock effect survive intact.
    assert_eq!(stock_of(&db, &product.id).await, 7);
    let current = service.get(&created.sale.id).await.unwrap();
    assert_eq!(current.items[0].quantity, 3);
    assert_eq!(current.sale.total_cents, created.sale.total_cents);
}

#[tokio::test]
async fn service_line_edits_adjust_totals_without_stock() {
    let db = test_db().await;
    let product = seed_product(&db, "Shampoo", 10_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let created = service.create(sale_request(&product.id, 1)).await.unwrap();
    assert_eq!(created.sale.total_cents, 11_900);

    let with_service = service
        .add_service_line(
            &created.sale.id,
            ServiceLineInput {
                service_id: external_id(),
                pet_id: external_id(),
                quantity: 1,
                unit_price_cents: 5_000,
            },
        )
        .await
        .unwrap();
    assert_eq!(with_service.service_items.len(), 1);
    assert_eq!(with_service.sale.subtotal_cents, 15_000);
    assert_eq!(with_service.sale.total_cents, 16_900);

    let line_id = with_service.service_items[0].id.clone();
    let line = ServiceLineInput {
        service_id: with_service.service_items[0].service_id.clone(),
        pet_id: with_service.service_items[0].pet_id.clone(),
        quantity: 3,
        unit_price_cents: 5_000,
    };
    let replaced = service
        .update_service_line(&created.sale.id, &line_id, line)
        .await
        .unwrap();
    assert_eq!(replaced.service_items[0].id, line_id);
    assert_eq!(replaced.service_items[0].subtotal_cents, 15_000);
    assert_eq!(replaced.sale.total_cents, 26_900);

    let removed = service
        .remove_service_line(&created.sale.id, &line_id)
        .await
        .unwrap();
    assert!(removed.service_items.is_empty());
    assert_eq!(removed.sale.total_cents, created.sale.total_cents);

    // Service lines never touch the shelf.
    assert_eq!(stock_of(&db, &product.id).await, 9);
}

#[tokio::test]
async fn service_line_from_another_sale_is_rejected() {
    let db = test_db().await;
    let product = seed_product(&db, "Collar", 2_000, 1900, 10).await;
    let service = SaleService::new(db.clone());

    let mut req = sale_request(&product.id, 1);
    req.service_lines = vec![ServiceLineInput {
        service_id: external_id(),
        pet_id: external_id(),
        quantity: 1,
        unit_price_cents: 4_000,
    }];
    let first = service.create(req).await.unwrap();
    let second = service.create(sale_request(&product.id, 1)).await.unwrap();

    let err = service
        .remove_service_line(&second.sale.id, &first.service_items[0].id)
        .await
        .unwrap_err();
    assert_eq!(err.code, ErrorCode::NotFound);
}
