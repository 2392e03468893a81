//! Order service - placing orders and driving the status lifecycle.
//!
//! This service handles:
//! - Pricing line items from the catalog (the client total is never trusted)
//! - Order id generation with retry on collision
//! - Ownership checks for reads
//! - Validated, race-free status transitions

use chrono::Utc;
use rand::Rng;
use rust_decimal::Decimal;

use crate::{
    error::AppError,
    models::{
        order::{CreateOrderRequest, LineItem, Order, OrderStatus},
        session::{Session, UserIdentity},
        user::{is_valid_email, normalize_email},
    },
    state::OrderSettings,
    store::Store,
};

/// Attempts at finding an unused order id.
const MAX_ID_ATTEMPTS: usize = 5;

/// Attempts at applying a status change while other admins race us.
const MAX_STATUS_ATTEMPTS: usize = 3;

/// `ORD-` followed by ten random digits.
pub fn generate_order_id() -> String {
    let suffix: u64 = rand::rng().random_range(0..10_000_000_000);
    format!("ORD-{suffix:010}")
}

/// Largest quantity accepted on a single line item.
pub const MAX_LINE_QUANTITY: u32 = 1_000;

/// Largest order total the `orders.amount NUMERIC(12, 2)` column holds.
fn max_order_total() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// More than one paisa apart. Differences too large to represent diverge.
fn diverges(client: Decimal, server: Decimal) -> bool {
    client
        .checked_sub(server)
        .is_none_or(|delta| delta.abs() > Decimal::new(1, 2))
}

fn total_too_large() -> AppError {
    AppError::Validation(format!("Order total cannot exceed {}", max_order_total()))
}

/// Place an order for the signed-in customer.
///
/// # Process
///
/// 1. Validate address, quantities and contact details
/// 2. Price every line item from the current catalog
/// 3. Total = subtotals + shipping fee; reject a diverging client total
/// 4. Insert with status `Pending`, regenerating the id on collision
///
/// Stock is not reserved or decremented.
///
/// # Errors
///
/// - `Validation`: empty cart, bad quantity, unknown product or variant,
///   bad address, or a price/total that differs from the catalog
pub async fn create_order(
    store: &dyn Store,
    settings: &OrderSettings,
    owner: &UserIdentity,
    request: CreateOrderRequest,
) -> Result<Order, AppError> {
    if request.item_details.is_empty() {
        return Err(AppError::Validation("Order must contain at least one item".into()));
    }
    request.address.validate()?;

    let customer = request
        .customer
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .unwrap_or_else(|| owner.name.clone());

    let email = request
        .email
        .map(|e| normalize_email(&e))
        .filter(|e| !e.is_empty())
        .unwrap_or_else(|| owner.email.clone());
    if !is_valid_email(&email) {
        return Err(AppError::Validation(format!("{email} is not a valid email!")));
    }

    let now = Utc::now();
    let mut item_details = Vec::with_capacity(request.item_details.len());

    for item in request.item_details {
        if item.quantity == 0 {
            return Err(AppError::Validation("Quantity must be at least 1".into()));
        }
        if item.quantity > MAX_LINE_QUANTITY {
            return Err(AppError::Validation(format!(
                "Quantity cannot exceed {MAX_LINE_QUANTITY}"
            )));
        }

        let product = store
            .find_product(item.product_id)
            .await?
            .ok_or_else(|| AppError::Validation(format!("Product {} not found", item.product_id)))?;

        let unit_price = product.effective_price(
            item.selected_color.as_deref(),
            item.selected_size.as_deref(),
            now,
        )?;

        if let Some(shown) = item.price {
            if diverges(shown, unit_price) {
                return Err(AppError::Validation(format!(
                    "Price of {} has changed to {unit_price}",
                    product.name
                )));
            }
        }

        item_details.push(LineItem {
            product_id: product.id,
            name: product.name,
            quantity: item.quantity,
            price: unit_price,
            selected_color: item.selected_color,
            selected_size: item.selected_size,
        });
    }

    let amount = item_details
        .iter()
        .try_fold(settings.shipping_fee, |total, item| {
            item.subtotal().and_then(|sub| total.checked_add(sub))
        })
        .filter(|total| *total <= max_order_total())
        .ok_or_else(total_too_large)?;

    if let Some(client_amount) = request.amount {
        if diverges(client_amount, amount) {
            return Err(AppError::Validation(format!(
                "Order total {client_amount} does not match {amount}"
            )));
        }
    }

    let items = u32::try_from(item_details.len())
        .map_err(|_| AppError::Validation("Too many line items".into()))?;

    let mut order = Order {
        id: generate_order_id(),
        user_id: owner.id,
        customer,
        email,
        date: now,
        amount,
        items,
        item_details,
        status: OrderStatus::Pending,
        address: request.address,
        payment_method: request.payment_method,
    };

    for attempt in 1..=MAX_ID_ATTEMPTS {
        match store.insert_order(order.clone()).await {
            Ok(created) => {
                tracing::info!(
                    order_id = %created.id,
                    user_id = %created.user_id,
                    amount = %created.amount,
                    "order created"
                );
                return Ok(created);
            }
            Err(AppError::Conflict(_)) if attempt < MAX_ID_ATTEMPTS => {
                tracing::warn!(order_id = %order.id, attempt, "order id collision, retrying");
                order.id = generate_order_id();
            }
            Err(e) => return Err(e),
        }
    }

    Err(AppError::Internal("could not allocate an order id".into()))
}

/// All orders, newest first. Admin only.
pub async fn list_all(store: &dyn Store) -> Result<Vec<Order>, AppError> {
    store.list_orders().await
}

/// Orders owned by the customer, newest first.
pub async fn list_for_user(store: &dyn Store, owner: &UserIdentity) -> Result<Vec<Order>, AppError> {
    store.list_orders_for_user(owner.id).await
}

/// Fetch one order.
///
/// Customers only see their own orders; anything else reads as not found so
/// other customers cannot discover which order ids exist. Admin sessions see every order.
pub async fn get_order(store: &dyn Store, session: &Session, id: &str) -> Result<Order, AppError> {
    let order = store
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;

    match session {
        Session::Admin(_) => Ok(order),
        Session::User(user) if user.id == order.user_id => Ok(order),
        Session::User(_) => Err(AppError::NotFound("Order")),
    }
}

/// Move an order to the requested status.
///
/// The change is applied with a compare-and-set on the status that was read,
/// so two admins acting at once cannot both move the same order from the same
/// starting point.
///
/// The order is looked up before the status name is parsed, so an unknown id
/// is reported as not found whatever the requested status.
///
/// # Errors
///
/// - `NotFound("Order")`: no such order
/// - `Validation`: unknown status name
/// - `InvalidTransition`: the lifecycle does not allow the move
pub async fn update_status(
    store: &dyn Store,
    id: &str,
    requested: &str,
) -> Result<Order, AppError> {
    let mut current = store
        .find_order(id)
        .await?
        .ok_or(AppError::NotFound("Order"))?;
    let requested: OrderStatus = requested.parse()?;

    for _ in 0..MAX_STATUS_ATTEMPTS {
        let next = current.status.next(requested)?;

        if let Some(updated) = store.compare_and_set_status(id, current.status, next).await? {
            tracing::info!(order_id = %id, from = %current.status, to = %next, "order status changed");
            return Ok(updated);
        }

        current = store
            .find_order(id)
            .await?
            .ok_or(AppError::NotFound("Order"))?;
    }

    Err(AppError::Conflict(
        "Order was modified concurrently, please retry".into(),
    ))
}

/// Remove an order permanently. Admin only.
pub async fn delete_order(store: &dyn Store, id: &str) -> Result<(), AppError> {
    if !store.delete_order(id).await? {
        return Err(AppError::NotFound("Order"));
    }
    tracing::info!(order_id = %id, "order deleted");
    Ok(())
}
