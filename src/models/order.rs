//! Order data models, the status lifecycle and API request types.
//!
//! This module defines:
//! - `Order`: stored purchase record with embedded line items and address
//! - `OrderStatus`: closed status set plus the transition rule
//! - Request types for placing orders and changing status

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::user::is_valid_postal_code;

/// Lifecycle status of an order.
///
/// The success path is `Pending → Processing → Shipped → Delivered`.
/// `Cancelled` may be reached from any non-terminal status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OrderStatus {
    Pending,
    Processing,
    Shipped,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 5] = [
        OrderStatus::Pending,
        OrderStatus::Processing,
        OrderStatus::Shipped,
        OrderStatus::Delivered,
        OrderStatus::Cancelled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            OrderStatus::Pending => "Pending",
            OrderStatus::Processing => "Processing",
            OrderStatus::Shipped => "Shipped",
            OrderStatus::Delivered => "Delivered",
            OrderStatus::Cancelled => "Cancelled",
        }
    }

    /// Delivered and Cancelled accept no further transitions.
    pub fn is_terminal(self) -> bool {
        matches!(self, OrderStatus::Delivered | OrderStatus::Cancelled)
    }

    /// Position on the success path. `None` for Cancelled.
    fn progress(self) -> Option<u8> {
        match self {
            OrderStatus::Pending => Some(0),
            OrderStatus::Processing => Some(1),
            OrderStatus::Shipped => Some(2),
            OrderStatus::Delivered => Some(3),
            OrderStatus::Cancelled => None,
        }
    }

    /// Compute the status an order moves to when `requested` is asked for.
    ///
    /// Forward moves along the success path may skip steps (an admin can mark
    /// a pending order as shipped). Moving backwards, staying in place or
    /// leaving a terminal status is rejected.
    pub fn next(self, requested: OrderStatus) -> Result<OrderStatus, AppError> {
        let allowed = !self.is_terminal()
            && match (self.progress(), requested.progress()) {
                (_, None) => true,
                (Some(current), Some(target)) => target > current,
                (None, Some(_)) => false,
            };

        if allowed {
            Ok(requested)
        } else {
            Err(AppError::InvalidTransition {
                from: self,
                to: requested,
            })
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OrderStatus {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .into_iter()
            .find(|status| status.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| AppError::Validation(format!("Unknown order status: {s}")))
    }
}

/// How the customer pays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Cash on delivery
    Cod,
    Online,
}

impl PaymentMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            PaymentMethod::Cod => "cod",
            PaymentMethod::Online => "online",
        }
    }
}

impl FromStr for PaymentMethod {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cod" => Ok(PaymentMethod::Cod),
            "online" => Ok(PaymentMethod::Online),
            other => Err(AppError::Validation(format!("Unknown payment method: {other}"))),
        }
    }
}

/// One purchased product/variant/size combination, embedded in an order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItem {
    pub product_id: i64,
    pub name: String,
    pub quantity: u32,

    /// Unit price resolved from the catalog when the order was placed
    pub price: Decimal,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_color: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selected_size: Option<String>,
}

impl LineItem {
    /// Unit price times quantity, `None` on overflow.
    pub fn subtotal(&self) -> Option<Decimal> {
        self.price.checked_mul(Decimal::from(self.quantity))
    }
}

/// Delivery address captured at checkout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingAddress {
    pub full_name: String,
    pub phone_number: String,
    pub address_line1: String,
    #[serde(default)]
    pub address_line2: Option<String>,
    pub city: String,
    pub state: String,
    pub pincode: String,
}

impl ShippingAddress {
    pub fn validate(&self) -> Result<(), AppError> {
        let required = [
            ("fullName", &self.full_name),
            ("phoneNumber", &self.phone_number),
            ("addressLine1", &self.address_line1),
            ("city", &self.city),
            ("state", &self.state),
        ];
        if let Some((field, _)) = required.iter().find(|(_, value)| value.trim().is_empty()) {
            return Err(AppError::Validation(format!("Address {field} is required")));
        }

        if !is_valid_postal_code(&self.pincode) {
            return Err(AppError::Validation(format!(
                "{} is not a valid postal code!",
                self.pincode
            )));
        }

        Ok(())
    }
}

/// Stored purchase record.
///
/// # JSON Example
///
/// ```json
/// {
///   "id": "ORD-4820193746",
///   "userId": "550e8400-e29b-41d4-a716-446655440000",
///   "customer": "Asha",
///   "email": "asha@example.com",
///   "date": "2025-12-20T10:00:00Z",
///   "amount": 240,
///   "items": 1,
///   "itemDetails": [{ "productId": 7, "name": "Cotton Kurta", "quantity": 2, "price": 100 }],
///   "status": "Pending",
///   "address": { "fullName": "Asha", "phoneNumber": "9876543210", "...": "..." },
///   "paymentMethod": "cod"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub id: String,

    /// Owning user. Lookups of "my orders" match on this, not on the email.
    pub user_id: Uuid,

    pub customer: String,
    pub email: String,
    pub date: DateTime<Utc>,

    /// Line item subtotals plus the shipping fee
    pub amount: Decimal,

    /// Number of line items
    pub items: u32,

    pub item_details: Vec<LineItem>,
    pub status: OrderStatus,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Line item as sent by the checkout page.
///
/// Only the product, variant selection and quantity are trusted. `name` and
/// `price` are optional echoes of what the customer saw; a diverging price is
/// rejected rather than charged.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineItemRequest {
    #[serde(deserialize_with = "deserialize_product_id")]
    pub product_id: i64,

    #[serde(default)]
    pub name: Option<String>,

    pub quantity: u32,

    #[serde(default)]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub selected_color: Option<String>,

    #[serde(default)]
    pub selected_size: Option<String>,
}

/// Request body for `POST /api/orders`.
///
/// `customer` and `email` default to the session's name and email.
/// `amount`, when present, must match the server-computed total.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub customer: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub amount: Option<Decimal>,

    pub item_details: Vec<LineItemRequest>,
    pub address: ShippingAddress,
    pub payment_method: PaymentMethod,
}

/// Request body for `PUT /api/orders/{id}`.
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    pub status: String,
}

/// The storefront sends numeric ids; older clients send them as strings.
fn deserialize_product_id<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Repr {
        Number(i64),
        Text(String),
    }

    match Repr::deserialize(deserializer)? {
        Repr::Number(id) => Ok(id),
        Repr::Text(text) => text
            .trim()
            .parse()
            .map_err(|_| serde::de::Error::custom(format!("invalid product id: {text}"))),
    }
}
