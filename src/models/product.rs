//! Catalog data models and API request types.
//!
//! A product is stored as one document: its color variants, their size
//! options and the accumulated reviews are embedded.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Product line the item is sold under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Men,
    Women,
    Children,
}

impl Category {
    pub fn as_str(self) -> &'static str {
        match self {
            Category::Men => "Men",
            Category::Women => "Women",
            Category::Children => "Children",
        }
    }
}

impl std::str::FromStr for Category {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Men" => Ok(Category::Men),
            "Women" => Ok(Category::Women),
            "Children" => Ok(Category::Children),
            other => Err(AppError::Validation(format!("Unknown category: {other}"))),
        }
    }
}

/// A sellable size within a color variant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SizeOption {
    pub size: String,
    pub price: Decimal,
    pub stock: u32,
}

/// Color-specific grouping of size options.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub color_name: String,
    #[serde(default)]
    pub color_code: Option<String>,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub sizes: Vec<SizeOption>,
}

/// A customer review. Reviews are append-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Review {
    pub id: String,
    pub username: String,
    pub rating: u8,
    pub comment: String,
    pub date: DateTime<Utc>,
}

/// Catalog entry.
///
/// `rating` is derived: the mean of all review ratings, recomputed by the
/// store whenever a review is appended. It cannot be set through the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub id: i64,
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub product_type: String,
    pub description: String,
    pub base_price: Decimal,
    pub image: String,
    pub rating: f64,

    /// Percentage off, 0 to 100
    pub discount: Decimal,

    pub offer_ends_at: Option<DateTime<Utc>>,
    pub variants: Vec<Variant>,
    pub reviews: Vec<Review>,
}

impl Product {
    /// True while a positive discount runs and its expiry is still ahead.
    pub fn offer_active(&self, now: DateTime<Utc>) -> bool {
        self.discount > Decimal::ZERO && self.offer_ends_at.is_some_and(|ends| now < ends)
    }

    /// Price a customer pays for one unit of the given selection.
    ///
    /// With a color and size the size option's own price is used, otherwise
    /// the base price. An active offer reduces it by the discount percentage.
    /// Returns a validation error when the selection names a color or size the
    /// product does not have.
    pub fn effective_price(
        &self,
        color: Option<&str>,
        size: Option<&str>,
        now: DateTime<Utc>,
    ) -> Result<Decimal, AppError> {
        let list_price = match (color, size) {
            (None, None) => self.base_price,
            (Some(color), size) => {
                let variant = self
                    .variants
                    .iter()
                    .find(|v| v.color_name.eq_ignore_ascii_case(color))
                    .ok_or_else(|| {
                        AppError::Validation(format!("{} has no color {color}", self.name))
                    })?;
                match size {
                    Some(size) => variant
                        .sizes
                        .iter()
                        .find(|s| s.size.eq_ignore_ascii_case(size))
                        .map(|s| s.price)
                        .ok_or_else(|| {
                            AppError::Validation(format!(
                                "{} has no size {size} in {color}",
                                self.name
                            ))
                        })?,
                    None => self.base_price,
                }
            }
            (None, Some(size)) => self
                .variants
                .iter()
                .flat_map(|v| v.sizes.iter())
                .find(|s| s.size.eq_ignore_ascii_case(size))
                .map(|s| s.price)
                .ok_or_else(|| {
                    AppError::Validation(format!("{} has no size {size}", self.name))
                })?,
        };

        if self.offer_active(now) {
            let factor = (Decimal::ONE_HUNDRED - self.discount) / Decimal::ONE_HUNDRED;
            Ok((list_price * factor).round_dp(2))
        } else {
            Ok(list_price)
        }
    }
}

/// Arithmetic mean of the review ratings, 0 when there are none.
pub fn average_rating(reviews: &[Review]) -> f64 {
    if reviews.is_empty() {
        return 0.0;
    }
    let total: f64 = reviews.iter().map(|r| f64::from(r.rating)).sum();
    total / reviews.len() as f64
}

/// Largest price the `NUMERIC(12, 2)` price columns hold.
fn max_price() -> Decimal {
    Decimal::new(999_999_999_999, 2)
}

/// Admin-editable product fields, used for both create and update.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    /// Optional on create; a fresh id is generated when absent. Ignored on update.
    #[serde(default)]
    pub id: Option<i64>,
    pub name: String,
    pub category: Category,
    #[serde(rename = "type")]
    pub product_type: String,
    #[serde(default)]
    pub description: String,
    pub base_price: Decimal,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub discount: Decimal,
    #[serde(default)]
    pub offer_ends_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl ProductInput {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.trim().is_empty() {
            return Err(AppError::Validation("Product name is required".into()));
        }
        if self.base_price < Decimal::ZERO {
            return Err(AppError::Validation("Base price cannot be negative".into()));
        }
        if self.base_price > max_price() {
            return Err(AppError::Validation(format!(
                "Base price cannot exceed {}",
                max_price()
            )));
        }
        if self.discount < Decimal::ZERO || self.discount > Decimal::ONE_HUNDRED {
            return Err(AppError::Validation(
                "Discount must be between 0 and 100".into(),
            ));
        }
        let negative_size = self
            .variants
            .iter()
            .flat_map(|v| v.sizes.iter())
            .any(|s| s.price < Decimal::ZERO);
        if negative_size {
            return Err(AppError::Validation("Size price cannot be negative".into()));
        }
        let oversized = self
            .variants
            .iter()
            .flat_map(|v| v.sizes.iter())
            .any(|s| s.price > max_price());
        if oversized {
            return Err(AppError::Validation(format!(
                "Size price cannot exceed {}",
                max_price()
            )));
        }
        Ok(())
    }

    /// Build a fresh product document with no reviews.
    pub fn into_product(self, id: i64) -> Product {
        Product {
            id,
            name: self.name,
            category: self.category,
            product_type: self.product_type,
            description: self.description,
            base_price: self.base_price,
            image: self.image,
            rating: 0.0,
            discount: self.discount,
            offer_ends_at: self.offer_ends_at,
            variants: self.variants,
            reviews: Vec::new(),
        }
    }
}

/// Request body for `POST /api/products/{id}/review`.
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    pub rating: u8,
    #[serde(default)]
    pub comment: String,
}

impl ReviewRequest {
    pub fn into_review(self, username: String) -> Result<Review, AppError> {
        if !(1..=5).contains(&self.rating) {
            return Err(AppError::Validation(
                "Rating must be between 1 and 5".into(),
            ));
        }
        Ok(Review {
            id: Uuid::new_v4().simple().to_string(),
            username,
            rating: self.rating,
            comment: self.comment,
            date: Utc::now(),
        })
    }
}
