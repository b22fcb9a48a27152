//! Domain types for catalog data.
//!
//! These are flattened from the Admin API's edge/node shape and are what the
//! JSON endpoints return, the cache stores and the renderer consumes.

use products_showcase_core::Price;
use serde::{Deserialize, Serialize};

/// Product lifecycle status.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductStatus {
    #[default]
    Active,
    Archived,
    Draft,
    #[serde(other)]
    Unknown,
}

impl ProductStatus {
    /// Whether the product may be shown on the public site.
    #[must_use]
    pub const fn is_publicly_visible(self) -> bool {
        matches!(self, Self::Active | Self::Archived)
    }
}

/// A monetary amount as returned by Shopify (decimal string + ISO code).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Money {
    pub amount: String,
    pub currency_code: String,
}

impl Money {
    /// Parse into a decimal price; `None` if the amount is malformed.
    #[must_use]
    pub fn to_price(&self) -> Option<Price> {
        Price::parse(&self.amount, self.currency_code.clone()).ok()
    }
}

/// Product or variant image.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Image {
    #[serde(default)]
    pub id: Option<String>,
    pub url: String,
    #[serde(default)]
    pub alt_text: Option<String>,
}

/// Product search result for the editor autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummary {
    pub id: String,
    pub title: String,
    pub handle: String,
    /// Thumbnail URL; empty when the product has no image.
    pub image: String,
    pub price: String,
    pub currency: String,
}

/// Collection search result for the editor autocomplete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummary {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub image: String,
    pub products_count: u64,
}

/// Single collection lookup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionInfo {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub image: String,
}

/// Option name/value pair chosen by a variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedOption {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Variant {
    pub id: String,
    pub title: String,
    pub price: Money,
    #[serde(default)]
    pub compare_at_price: Option<Money>,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub image: Option<Image>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}

/// Visual swatch configured for an option value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Swatch {
    #[serde(default)]
    pub color: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionValue {
    pub name: String,
    #[serde(default)]
    pub swatch: Option<Swatch>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductOption {
    pub id: String,
    pub name: String,
    pub values: Vec<OptionValue>,
}

/// Full product as used by the renderer and `GET /api/products/{id}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductDetail {
    pub id: String,
    pub title: String,
    pub handle: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub product_type: String,
    #[serde(default)]
    pub has_out_of_stock_variants: bool,
    #[serde(default)]
    pub status: ProductStatus,
    /// Lowest variant price.
    #[serde(default)]
    pub min_price: Option<Money>,
    #[serde(default)]
    pub options: Vec<ProductOption>,
    #[serde(default)]
    pub images: Vec<Image>,
    #[serde(default)]
    pub variants: Vec<Variant>,
}

impl ProductDetail {
    /// The option whose name is `color` (case-insensitive), if any.
    #[must_use]
    pub fn color_option(&self) -> Option<&ProductOption> {
        self.options
            .iter()
            .find(|option| option.name.eq_ignore_ascii_case("color"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_status_visibility() {
        assert!(ProductStatus::Active.is_publicly_visible());
        assert!(ProductStatus::Archived.is_publicly_visible());
        assert!(!ProductStatus::Draft.is_publicly_visible());
        assert!(!ProductStatus::Unknown.is_publicly_visible());
    }

    #[test]
    fn test_unknown_status_deserializes() {
        let status: ProductStatus = serde_json::from_str("\"UNLISTED\"").unwrap();
        assert_eq!(status, ProductStatus::Unknown);
    }

    #[test]
    fn test_money_to_price() {
        let money = Money {
            amount: "24.5".to_string(),
            currency_code: "EUR".to_string(),
        };
        assert_eq!(money.to_price().unwrap().display(), "€24.50");
    }
}
