//! Live integration tests for souqcart-db using `#[sqlx::test]`.
//!
//! Each test gets a fresh, fully-migrated Postgres database spun up by the
//! sqlx test harness. The `migrations` path is relative to the crate root
//! (`crates/souqcart-db/`), so `"../../migrations"` resolves to the workspace
//! migration directory.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use souqcart_core::{
    pricing, AddressInput, AddressSnapshot, CartLine, CouponKind, NewCoupon, OrderScope,
    OrderState, OrderStatus, PaymentMethod, PaymentStatus, Role, SalesSummary, ShippingMethod,
};
use souqcart_db::{
    account_counts, add_to_wishlist, cancel_order, consume_coupon, create_address, create_coupon,
    create_order, create_product, create_session, create_user, create_vendor, deactivate_product,
    get_address, get_coupon_by_code, get_order, get_products_by_ids, list_active_products,
    list_addresses, list_order_items, list_orders, list_vendors, list_wishlist, order_vendor_ids,
    product_counts, remove_from_wishlist, sales_groups, seed_demo_data, set_default_address,
    set_vendor_approval, transition_order, update_product, viewer_for_session, DbError, NewOrder,
    NewProduct, OrderFilter, ProductUpdate,
};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn dec(s: &str) -> Decimal {
    s.parse().expect("decimal literal")
}

async fn insert_vendor_with_product(
    pool: &sqlx::PgPool,
    slug: &str,
    price: &str,
    stock: i32,
) -> (Uuid, souqcart_db::ProductRow) {
    let user = create_user(pool, &format!("{slug}@vendors.test"), slug, Role::Vendor)
        .await
        .unwrap_or_else(|e| panic!("create vendor user '{slug}' failed: {e}"));
    let vendor = create_vendor(pool, user.id, &format!("{slug} store"), true)
        .await
        .expect("create_vendor failed");
    let product = create_product(
        pool,
        vendor.id,
        &NewProduct {
            name: format!("{slug} product"),
            price: dec(price),
            stock,
            active: true,
        },
    )
    .await
    .expect("create_product failed");
    (vendor.id, product)
}

async fn insert_customer(pool: &sqlx::PgPool, email: &str) -> Uuid {
    create_user(pool, email, "Test Customer", Role::Customer)
        .await
        .unwrap_or_else(|e| panic!("create customer '{email}' failed: {e}"))
        .id
}

async fn insert_coupon(pool: &sqlx::PgPool, code: &str, usage_limit: Option<i32>) -> Uuid {
    create_coupon(
        pool,
        &NewCoupon {
            code: code.to_string(),
            description: None,
            kind: CouponKind::Percentage,
            value: dec("10"),
            min_order_amount: None,
            max_discount_amount: None,
            usage_limit,
            start_date: Utc::now() - Duration::days(1),
            end_date: Utc::now() + Duration::days(1),
            active: true,
        },
    )
    .await
    .expect("create_coupon failed")
    .id
}

fn line_for(product: &souqcart_db::ProductRow, quantity: u32) -> CartLine {
    CartLine {
        product_id: product.id,
        vendor_id: product.vendor_id,
        name: product.name.clone(),
        unit_price: product.price,
        quantity,
        variant_label: None,
        stock_available: u32::try_from(product.stock).expect("stock"),
    }
}

fn address() -> AddressSnapshot {
    AddressSnapshot {
        full_name: "Layla Haddad".to_string(),
        phone: None,
        street: "12 King Fahd Rd".to_string(),
        city: "Riyadh".to_string(),
        state: None,
        country: "SA".to_string(),
        zip_code: None,
    }
}

fn new_order(
    order_number: &str,
    user_id: Uuid,
    lines: Vec<CartLine>,
    coupon_id: Option<Uuid>,
    method: PaymentMethod,
) -> NewOrder {
    let pricing = pricing::calculate(&lines, ShippingMethod::Standard, None).expect("pricing");
    NewOrder {
        order_number: order_number.to_string(),
        user_id,
        coupon_id,
        pricing,
        state: OrderState::initial(method),
        payment_method: method,
        shipping_method: ShippingMethod::Standard,
        shipping_address: address(),
        notes: None,
        lines,
    }
}

async fn stock_of(pool: &sqlx::PgPool, product_id: Uuid) -> i32 {
    get_products_by_ids(pool, &[product_id])
        .await
        .expect("get_products_by_ids failed")[0]
        .stock
}

fn address_input(street: &str, is_default: bool) -> AddressInput {
    AddressInput {
        label: None,
        full_name: "Layla Haddad".to_string(),
        phone: None,
        street: street.to_string(),
        city: "Jeddah".to_string(),
        state: None,
        country: "SA".to_string(),
        zip_code: None,
        is_default,
    }
    .normalized()
    .expect("valid address")
}

// ---------------------------------------------------------------------------
// Section 1: Coupons
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_consumption_of_last_use_has_one_winner(pool: sqlx::PgPool) {
    let coupon_id = insert_coupon(&pool, "ONCE", Some(1)).await;

    let (a, b) = tokio::join!(
        consume_coupon(&pool, coupon_id),
        consume_coupon(&pool, coupon_id)
    );
    let wins = [a.expect("consume a"), b.expect("consume b")]
        .into_iter()
        .filter(|won| *won)
        .count();
    assert_eq!(wins, 1, "exactly one consumer should get the last use");

    let coupon = get_coupon_by_code(&pool, "once")
        .await
        .expect("lookup failed")
        .expect("coupon exists");
    assert_eq!(coupon.used_count, 1);
}

#[sqlx::test(migrations = "../../migrations")]
async fn unlimited_coupon_keeps_counting(pool: sqlx::PgPool) {
    let coupon_id = insert_coupon(&pool, "ALWAYS", Some(0)).await;
    for _ in 0..3 {
        assert!(consume_coupon(&pool, coupon_id).await.expect("consume"));
    }
    let coupon = get_coupon_by_code(&pool, "ALWAYS")
        .await
        .expect("lookup failed")
        .expect("coupon exists");
    assert_eq!(coupon.used_count, 3);
    assert!(!coupon.to_coupon().expect("domain coupon").is_exhausted());
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_coupon_code_is_a_conflict(pool: sqlx::PgPool) {
    insert_coupon(&pool, "DUP", None).await;
    let mut again = NewCoupon {
        code: "dup".to_string(),
        description: None,
        kind: CouponKind::Fixed,
        value: dec("5"),
        min_order_amount: None,
        max_discount_amount: None,
        usage_limit: None,
        start_date: Utc::now(),
        end_date: Utc::now(),
        active: true,
    };
    again = again.validated().expect("valid");
    let err = create_coupon(&pool, &again).await.unwrap_err();
    assert!(matches!(err, DbError::Conflict(_)), "got {err:?}");
}

// ---------------------------------------------------------------------------
// Section 2: Order creation
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn create_order_snapshots_lines_and_decrements_stock(pool: sqlx::PgPool) {
    let (vendor_id, product) = insert_vendor_with_product(&pool, "dates", "79.99", 5).await;
    let user_id = insert_customer(&pool, "buyer@test.local").await;
    let coupon_id = insert_coupon(&pool, "WELCOME10", None).await;

    let (order, items) = create_order(
        &pool,
        &new_order(
            "SC-TEST-0001",
            user_id,
            vec![line_for(&product, 2)],
            Some(coupon_id),
            PaymentMethod::Stripe,
        ),
    )
    .await
    .expect("create_order failed");

    assert_eq!(order.status, "PENDING");
    assert_eq!(order.payment_status, "PENDING");
    assert_eq!(order.shipping_address.0.city, "Riyadh");
    assert_eq!(order.total, order.subtotal + order.shipping_cost + order.tax - order.discount);
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].unit_price, dec("79.99"));
    assert_eq!(items[0].vendor_id, vendor_id);

    assert_eq!(stock_of(&pool, product.id).await, 3);
    let coupon = get_coupon_by_code(&pool, "WELCOME10")
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(coupon.used_count, 1);

    assert_eq!(
        list_order_items(&pool, order.id).await.expect("items").len(),
        1
    );
    assert_eq!(
        order_vendor_ids(&pool, order.id).await.expect("vendors"),
        vec![vendor_id]
    );
}

#[sqlx::test(migrations = "../../migrations")]
async fn cod_order_is_stored_confirmed_with_pending_payment(pool: sqlx::PgPool) {
    let (_, product) = insert_vendor_with_product(&pool, "saffron", "24.50", 3).await;
    let user_id = insert_customer(&pool, "cod@test.local").await;

    let (order, _) = create_order(
        &pool,
        &new_order(
            "SC-TEST-COD",
            user_id,
            vec![line_for(&product, 1)],
            None,
            PaymentMethod::Cod,
        ),
    )
    .await
    .expect("create_order failed");

    let state = order.state().expect("state");
    assert_eq!(state.status, OrderStatus::Confirmed);
    assert_eq!(state.payment_status, PaymentStatus::Pending);
    assert_eq!(order.payment_method, "cod");
}

#[sqlx::test(migrations = "../../migrations")]
async fn insufficient_stock_rolls_back_everything(pool: sqlx::PgPool) {
    let (_, plenty) = insert_vendor_with_product(&pool, "plenty", "5.00", 10).await;
    let (_, scarce) = insert_vendor_with_product(&pool, "scarce", "5.00", 1).await;
    let user_id = insert_customer(&pool, "greedy@test.local").await;
    let coupon_id = insert_coupon(&pool, "ROLLBACK", Some(5)).await;

    let mut lines = vec![line_for(&plenty, 2), line_for(&scarce, 1)];
    lines[1].quantity = 2;
    lines[1].stock_available = 2;
    let err = create_order(
        &pool,
        &new_order("SC-TEST-SHORT", user_id, lines, Some(coupon_id), PaymentMethod::Stripe),
    )
    .await
    .unwrap_err();

    assert!(
        matches!(err, DbError::InsufficientStock { product_id } if product_id == scarce.id),
        "got {err:?}"
    );
    assert_eq!(stock_of(&pool, plenty.id).await, 10);
    assert_eq!(stock_of(&pool, scarce.id).await, 1);
    let coupon = get_coupon_by_code(&pool, "ROLLBACK")
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(coupon.used_count, 0);
}

#[sqlx::test(migrations = "../../migrations")]
async fn duplicate_order_number_is_reported_for_retry(pool: sqlx::PgPool) {
    let (_, product) = insert_vendor_with_product(&pool, "dup", "3.00", 10).await;
    let user_id = insert_customer(&pool, "dup@test.local").await;
    let order = new_order(
        "SC-SAME-AAAA",
        user_id,
        vec![line_for(&product, 1)],
        None,
        PaymentMethod::Stripe,
    );

    create_order(&pool, &order).await.expect("first insert");
    let err = create_order(&pool, &order).await.unwrap_err();
    assert!(
        matches!(&err, DbError::DuplicateOrderNumber(n) if n == "SC-SAME-AAAA"),
        "got {err:?}"
    );
    assert_eq!(stock_of(&pool, product.id).await, 9);
}

#[sqlx::test(migrations = "../../migrations")]
async fn concurrent_checkouts_cannot_overuse_coupon(pool: sqlx::PgPool) {
    let (_, product) = insert_vendor_with_product(&pool, "race", "10.00", 10).await;
    let user_id = insert_customer(&pool, "race@test.local").await;
    let coupon_id = insert_coupon(&pool, "LASTONE", Some(1)).await;

    let order = |number: &str| {
        new_order(
            number,
            user_id,
            vec![line_for(&product, 1)],
            Some(coupon_id),
            PaymentMethod::Stripe,
        )
    };
    let a = order("SC-RACE-A");
    let b = order("SC-RACE-B");
    let (ra, rb) = tokio::join!(create_order(&pool, &a), create_order(&pool, &b));

    let results = [ra, rb];
    let successes = results.iter().filter(|r| r.is_ok()).count();
    let exhausted = results
        .iter()
        .filter(|r| matches!(r, Err(DbError::CouponExhausted { .. })))
        .count();
    assert_eq!(successes, 1);
    assert_eq!(exhausted, 1);
    assert_eq!(stock_of(&pool, product.id).await, 9);
}

// ---------------------------------------------------------------------------
// Section 3: Transitions
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn transition_is_compare_and_set(pool: sqlx::PgPool) {
    let (_, product) = insert_vendor_with_product(&pool, "cas", "60.00", 4).await;
    let user_id = insert_customer(&pool, "cas@test.local").await;
    let (order, _) = create_order(
        &pool,
        &new_order(
            "SC-CAS-0001",
            user_id,
            vec![line_for(&product, 1)],
            None,
            PaymentMethod::Stripe,
        ),
    )
    .await
    .expect("create_order failed");

    let pending = order.state().expect("state");
    let paid = OrderState {
        status: OrderStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
    };

    let updated = transition_order(&pool, order.id, pending, paid, Some("pi_123"))
        .await
        .expect("first transition");
    assert_eq!(updated.status, "CONFIRMED");
    assert_eq!(updated.gateway_payment_id.as_deref(), Some("pi_123"));

    let err = transition_order(&pool, order.id, pending, paid, None)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::StaleOrderState { .. }), "got {err:?}");

    let fetched = get_order(&pool, order.id).await.expect("get_order");
    assert_eq!(fetched.gateway_payment_id.as_deref(), Some("pi_123"));

    let missing = transition_order(&pool, Uuid::new_v4(), pending, paid, None)
        .await
        .unwrap_err();
    assert!(matches!(missing, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn cancel_releases_stock_and_coupon(pool: sqlx::PgPool) {
    let (_, product) = insert_vendor_with_product(&pool, "cancel", "15.00", 6).await;
    let user_id = insert_customer(&pool, "cancel@test.local").await;
    let coupon_id = insert_coupon(&pool, "GIVEBACK", Some(1)).await;
    let (order, _) = create_order(
        &pool,
        &new_order(
            "SC-CANCEL-01",
            user_id,
            vec![line_for(&product, 4)],
            Some(coupon_id),
            PaymentMethod::Stripe,
        ),
    )
    .await
    .expect("create_order failed");
    assert_eq!(stock_of(&pool, product.id).await, 2);

    let state = order.state().expect("state");
    let next = OrderState {
        status: OrderStatus::Cancelled,
        ..state
    };
    let cancelled = cancel_order(&pool, order.id, state, next)
        .await
        .expect("cancel_order");
    assert_eq!(cancelled.status, "CANCELLED");
    assert_eq!(stock_of(&pool, product.id).await, 6);

    let coupon = get_coupon_by_code(&pool, "GIVEBACK")
        .await
        .expect("lookup")
        .expect("exists");
    assert_eq!(coupon.used_count, 0);

    let again = cancel_order(&pool, order.id, state, next).await.unwrap_err();
    assert!(matches!(again, DbError::StaleOrderState { .. }));
    assert_eq!(stock_of(&pool, product.id).await, 6);
}

#[sqlx::test(migrations = "../../migrations")]
async fn cancel_restocks_every_variant_line_of_a_product(pool: sqlx::PgPool) {
    let (_, product) = insert_vendor_with_product(&pool, "variants", "9.00", 10).await;
    let user_id = insert_customer(&pool, "variants@test.local").await;
    let small = CartLine {
        variant_label: Some("S".to_string()),
        ..line_for(&product, 2)
    };
    let medium = CartLine {
        variant_label: Some("M".to_string()),
        ..line_for(&product, 3)
    };
    let (order, items) = create_order(
        &pool,
        &new_order(
            "SC-VARIANT-01",
            user_id,
            vec![small, medium],
            None,
            PaymentMethod::Stripe,
        ),
    )
    .await
    .expect("create_order failed");
    assert_eq!(items.len(), 2);
    assert_eq!(stock_of(&pool, product.id).await, 5);

    let state = order.state().expect("state");
    let next = OrderState {
        status: OrderStatus::Cancelled,
        ..state
    };
    cancel_order(&pool, order.id, state, next)
        .await
        .expect("cancel_order");
    assert_eq!(stock_of(&pool, product.id).await, 10);
}

// ---------------------------------------------------------------------------
// Section 4: Scoped listing
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn list_orders_applies_scope_status_and_paging(pool: sqlx::PgPool) {
    let (vendor_a, product_a) = insert_vendor_with_product(&pool, "alpha", "5.00", 50).await;
    let (vendor_b, product_b) = insert_vendor_with_product(&pool, "beta", "5.00", 50).await;
    let alice = insert_customer(&pool, "alice@test.local").await;
    let bob = insert_customer(&pool, "bob@test.local").await;

    for (i, (user, product, method)) in [
        (alice, &product_a, PaymentMethod::Stripe),
        (alice, &product_b, PaymentMethod::Cod),
        (bob, &product_a, PaymentMethod::Stripe),
    ]
    .into_iter()
    .enumerate()
    {
        create_order(
            &pool,
            &new_order(&format!("SC-LIST-{i}"), user, vec![line_for(product, 1)], None, method),
        )
        .await
        .expect("create_order failed");
    }

    let all = OrderFilter {
        status: None,
        page: 1,
        limit: 50,
    };

    let own = list_orders(&pool, OrderScope::Own(alice), &all).await.expect("own");
    assert_eq!(own.total, 2);
    assert!(own.orders.iter().all(|o| o.user_id == alice));

    let vendor = list_orders(&pool, OrderScope::Vendor(vendor_a), &all).await.expect("vendor");
    assert_eq!(vendor.total, 2);
    let vendor = list_orders(&pool, OrderScope::Vendor(vendor_b), &all).await.expect("vendor");
    assert_eq!(vendor.total, 1);

    let nothing = list_orders(&pool, OrderScope::Nothing, &all).await.expect("nothing");
    assert_eq!(nothing.total, 0);
    assert!(nothing.orders.is_empty());

    let confirmed = OrderFilter {
        status: Some(OrderStatus::Confirmed),
        ..all
    };
    let admin = list_orders(&pool, OrderScope::All, &confirmed).await.expect("admin");
    assert_eq!(admin.total, 1);
    assert_eq!(admin.orders[0].payment_method, "cod");

    let page_two = OrderFilter {
        status: None,
        page: 2,
        limit: 2,
    };
    let paged = list_orders(&pool, OrderScope::All, &page_two).await.expect("paged");
    assert_eq!(paged.total, 3);
    assert_eq!(paged.orders.len(), 1);
}

// ---------------------------------------------------------------------------
// Section 5: Addresses
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn first_address_becomes_default(pool: sqlx::PgPool) {
    let user_id = insert_customer(&pool, "first@test.local").await;
    let row = create_address(&pool, user_id, &address_input("1 First St", false))
        .await
        .expect("create_address");
    assert!(row.is_default);
    assert_eq!(row.label, "Home");
}

#[sqlx::test(migrations = "../../migrations")]
async fn setting_default_leaves_exactly_one(pool: sqlx::PgPool) {
    let user_id = insert_customer(&pool, "homes@test.local").await;
    let b = create_address(&pool, user_id, &address_input("B Street", true))
        .await
        .expect("create b");
    let a = create_address(&pool, user_id, &address_input("A Street", false))
        .await
        .expect("create a");
    assert!(b.is_default);
    assert!(!a.is_default);

    set_default_address(&pool, user_id, a.id)
        .await
        .expect("set_default_address");

    let rows = list_addresses(&pool, user_id).await.expect("list");
    let defaults: Vec<_> = rows.iter().filter(|r| r.is_default).collect();
    assert_eq!(defaults.len(), 1);
    assert_eq!(defaults[0].id, a.id);
    assert!(!get_address(&pool, b.id).await.expect("get b").is_default);
}

#[sqlx::test(migrations = "../../migrations")]
async fn creating_a_default_address_unsets_previous(pool: sqlx::PgPool) {
    let user_id = insert_customer(&pool, "swap@test.local").await;
    let old = create_address(&pool, user_id, &address_input("Old Rd", true))
        .await
        .expect("create old");
    let new = create_address(&pool, user_id, &address_input("New Rd", true))
        .await
        .expect("create new");

    assert!(new.is_default);
    assert!(!get_address(&pool, old.id).await.expect("get old").is_default);
}

#[sqlx::test(migrations = "../../migrations")]
async fn cannot_set_default_on_someone_elses_address(pool: sqlx::PgPool) {
    let owner = insert_customer(&pool, "owner@test.local").await;
    let intruder = insert_customer(&pool, "intruder@test.local").await;
    let mine = create_address(&pool, intruder, &address_input("Mine", true))
        .await
        .expect("create intruder address");
    let theirs = create_address(&pool, owner, &address_input("Theirs", true))
        .await
        .expect("create owner address");

    let err = set_default_address(&pool, intruder, theirs.id).await.unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    // Rolled back: the intruder keeps their own default.
    assert!(get_address(&pool, mine.id).await.expect("get mine").is_default);
}

// ---------------------------------------------------------------------------
// Section 6: Sessions and seed data
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn sessions_resolve_to_viewers(pool: sqlx::PgPool) {
    let customer = insert_customer(&pool, "viewer@test.local").await;
    let live = create_session(&pool, customer, Duration::hours(1))
        .await
        .expect("create_session");
    let expired = create_session(&pool, customer, Duration::hours(-1))
        .await
        .expect("create_session");

    let viewer = viewer_for_session(&pool, &live.token)
        .await
        .expect("lookup")
        .expect("live session resolves");
    assert_eq!(viewer.user_id, customer);
    assert_eq!(viewer.role, Role::Customer);
    assert!(viewer.vendor_id.is_none());

    assert!(viewer_for_session(&pool, &expired.token)
        .await
        .expect("lookup")
        .is_none());
    assert!(viewer_for_session(&pool, "nope").await.expect("lookup").is_none());
}

#[sqlx::test(migrations = "../../migrations")]
async fn unapproved_vendor_has_no_store_scope(pool: sqlx::PgPool) {
    let user = create_user(&pool, "pending@vendors.test", "Pending", Role::Vendor)
        .await
        .expect("create_user");
    create_vendor(&pool, user.id, "Pending Store", false)
        .await
        .expect("create_vendor");
    let session = create_session(&pool, user.id, Duration::hours(1))
        .await
        .expect("create_session");

    let viewer = viewer_for_session(&pool, &session.token)
        .await
        .expect("lookup")
        .expect("resolves");
    assert_eq!(viewer.role, Role::Vendor);
    assert!(viewer.vendor_id.is_none());
    assert_eq!(OrderScope::for_viewer(&viewer), OrderScope::Nothing);
}

#[sqlx::test(migrations = "../../migrations")]
async fn approving_a_store_grants_vendor_scope(pool: sqlx::PgPool) {
    let user = create_user(&pool, "later@vendors.test", "Later", Role::Vendor)
        .await
        .expect("create_user");
    let store = create_vendor(&pool, user.id, "Later Store", false)
        .await
        .expect("create_vendor");
    insert_vendor_with_product(&pool, "early", "5.00", 1).await;
    let session = create_session(&pool, user.id, Duration::hours(1))
        .await
        .expect("create_session");

    let pending = list_vendors(&pool, Some(false), 50).await.expect("list");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].id, store.id);
    assert_eq!(list_vendors(&pool, None, 50).await.expect("list").len(), 2);

    let approved = set_vendor_approval(&pool, store.id, true)
        .await
        .expect("approve");
    assert!(approved.approved);
    let viewer = viewer_for_session(&pool, &session.token)
        .await
        .expect("lookup")
        .expect("resolves");
    assert_eq!(viewer.vendor_id, Some(store.id));
    assert!(list_vendors(&pool, Some(false), 50).await.expect("list").is_empty());

    let err = set_vendor_approval(&pool, Uuid::new_v4(), true)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
}

#[sqlx::test(migrations = "../../migrations")]
async fn seed_is_idempotent(pool: sqlx::PgPool) {
    let first = seed_demo_data(&pool).await.expect("first seed");
    let second = seed_demo_data(&pool).await.expect("second seed");
    assert_eq!(first, second);

    let products: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
        .fetch_one(&pool)
        .await
        .expect("count products");
    assert_eq!(products, 4);

    let welcome = get_coupon_by_code(&pool, "welcome10")
        .await
        .expect("lookup")
        .expect("seeded");
    assert_eq!(welcome.kind, "percentage");
}

// ---------------------------------------------------------------------------
// Section 7: Catalog maintenance
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn vendors_update_only_their_own_products(pool: sqlx::PgPool) {
    let (vendor_id, product) = insert_vendor_with_product(&pool, "edit", "10.00", 3).await;
    let (other_vendor, _) = insert_vendor_with_product(&pool, "rival", "10.00", 3).await;

    let updated = update_product(
        &pool,
        vendor_id,
        product.id,
        &ProductUpdate {
            price: Some(dec("12.75")),
            stock: Some(9),
            ..ProductUpdate::default()
        },
    )
    .await
    .expect("update_product");
    assert_eq!(updated.price, dec("12.75"));
    assert_eq!(updated.stock, 9);
    assert_eq!(updated.name, product.name);
    assert!(updated.active);

    let err = update_product(
        &pool,
        other_vendor,
        product.id,
        &ProductUpdate {
            stock: Some(0),
            ..ProductUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert_eq!(stock_of(&pool, product.id).await, 9);

    let err = update_product(
        &pool,
        vendor_id,
        product.id,
        &ProductUpdate {
            stock: Some(-1),
            ..ProductUpdate::default()
        },
    )
    .await
    .unwrap_err();
    assert!(matches!(err, DbError::Sqlx(_)));
}

#[sqlx::test(migrations = "../../migrations")]
async fn deactivated_products_leave_the_catalog_but_keep_order_lines(pool: sqlx::PgPool) {
    let (vendor_id, product) = insert_vendor_with_product(&pool, "retire", "8.00", 4).await;
    let customer = insert_customer(&pool, "retire@customers.test").await;
    let (order, _) = create_order(
        &pool,
        &new_order(
            "SC-RETIRE-1",
            customer,
            vec![line_for(&product, 1)],
            None,
            PaymentMethod::Cod,
        ),
    )
    .await
    .expect("create_order");

    let row = deactivate_product(&pool, vendor_id, product.id)
        .await
        .expect("deactivate");
    assert!(!row.active);
    assert!(list_active_products(&pool, Some(vendor_id), 50)
        .await
        .expect("list")
        .is_empty());
    assert_eq!(list_order_items(&pool, order.id).await.expect("items").len(), 1);

    let counts = product_counts(&pool, Some(vendor_id)).await.expect("counts");
    assert_eq!(counts.products, 1);
    assert_eq!(counts.active_products, 0);
}

// ---------------------------------------------------------------------------
// Section 8: Wishlist
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn wishlist_saves_each_product_once_per_user(pool: sqlx::PgPool) {
    let (_, first) = insert_vendor_with_product(&pool, "wish", "30.00", 2).await;
    let (_, second) = insert_vendor_with_product(&pool, "want", "45.00", 2).await;
    let customer = insert_customer(&pool, "wish@customers.test").await;
    let other = insert_customer(&pool, "other@customers.test").await;

    assert!(add_to_wishlist(&pool, customer, first.id).await.expect("add"));
    assert!(!add_to_wishlist(&pool, customer, first.id).await.expect("add again"));
    assert!(add_to_wishlist(&pool, customer, second.id).await.expect("add"));
    assert!(add_to_wishlist(&pool, other, first.id).await.expect("add"));

    let saved = list_wishlist(&pool, customer).await.expect("list");
    assert_eq!(saved.len(), 2);
    assert!(saved.iter().any(|r| r.product_id == second.id && r.price == dec("45.00")));

    remove_from_wishlist(&pool, customer, first.id)
        .await
        .expect("remove");
    let err = remove_from_wishlist(&pool, customer, first.id)
        .await
        .unwrap_err();
    assert!(matches!(err, DbError::NotFound));
    assert_eq!(list_wishlist(&pool, customer).await.expect("list").len(), 1);
    assert_eq!(list_wishlist(&pool, other).await.expect("list").len(), 1);

    assert!(add_to_wishlist(&pool, customer, Uuid::new_v4()).await.is_err());
}

// ---------------------------------------------------------------------------
// Section 9: Analytics
// ---------------------------------------------------------------------------

#[sqlx::test(migrations = "../../migrations")]
async fn sales_groups_split_marketplace_and_vendor_views(pool: sqlx::PgPool) {
    let (vendor_a, product_a) = insert_vendor_with_product(&pool, "alpha", "20.00", 10).await;
    let (vendor_b, product_b) = insert_vendor_with_product(&pool, "beta", "5.00", 10).await;
    let customer = insert_customer(&pool, "stats@customers.test").await;

    // Both stores, paid by card.
    let (paid, _) = create_order(
        &pool,
        &new_order(
            "SC-STATS-1",
            customer,
            vec![line_for(&product_a, 2), line_for(&product_b, 1)],
            None,
            PaymentMethod::Stripe,
        ),
    )
    .await
    .expect("create paid order");
    let pending = OrderState::initial(PaymentMethod::Stripe);
    let settled = OrderState {
        status: OrderStatus::Confirmed,
        payment_status: PaymentStatus::Paid,
    };
    transition_order(&pool, paid.id, pending, settled, Some("pi_stats"))
        .await
        .expect("mark paid");

    // Store A only, cancelled before payment.
    let (dropped, _) = create_order(
        &pool,
        &new_order(
            "SC-STATS-2",
            customer,
            vec![line_for(&product_a, 1)],
            None,
            PaymentMethod::Stripe,
        ),
    )
    .await
    .expect("create dropped order");
    let cancelled = OrderState {
        status: OrderStatus::Cancelled,
        payment_status: PaymentStatus::Pending,
    };
    cancel_order(&pool, dropped.id, pending, cancelled)
        .await
        .expect("cancel");

    let marketplace = SalesSummary::from_groups(&sales_groups(&pool, None).await.expect("all"));
    assert_eq!(marketplace.total_orders, 2);
    assert_eq!(marketplace.gross_sales, paid.total);
    assert_eq!(marketplace.paid_sales, paid.total);

    let alpha = SalesSummary::from_groups(
        &sales_groups(&pool, Some(vendor_a))
            .await
            .expect("vendor a"),
    );
    assert_eq!(alpha.total_orders, 2);
    assert_eq!(alpha.gross_sales, dec("40.00"));
    assert!(alpha
        .orders_by_status
        .iter()
        .any(|c| c.status == OrderStatus::Cancelled && c.orders == 1));

    let beta = SalesSummary::from_groups(
        &sales_groups(&pool, Some(vendor_b))
            .await
            .expect("vendor b"),
    );
    assert_eq!(beta.total_orders, 1);
    assert_eq!(beta.paid_sales, dec("5.00"));

    let accounts = account_counts(&pool).await.expect("accounts");
    assert_eq!(accounts.customers, 1);
    assert_eq!(accounts.vendors, 2);
    assert_eq!(accounts.pending_vendors, 0);
    assert_eq!(product_counts(&pool, None).await.expect("products").products, 2);
}
