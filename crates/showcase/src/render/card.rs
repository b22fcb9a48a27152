//! Product card view model.

use std::collections::HashMap;

use products_showcase_core::Price;
use rust_decimal::Decimal;

use crate::shopify::{Image, ProductDetail, Variant};

/// Swatches shown before collapsing the rest into `+N`.
pub const MAX_SWATCHES: usize = 5;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardImage {
    pub url: String,
    pub alt: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardSwatch {
    pub label: String,
    /// Inline `background-*` declaration.
    pub style: String,
    /// Image of the first variant with this color, shown on hover.
    pub variant_image: Option<CardImage>,
}

/// Everything the card template needs for one product.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductCard {
    pub url: String,
    pub title: String,
    pub primary_image: Option<CardImage>,
    pub secondary_image: Option<CardImage>,
    pub price: String,
    pub swatches: Vec<CardSwatch>,
    pub extra_swatches: usize,
}

impl ProductCard {
    /// Build a card. `utm_query` is appended to the product URL when non-empty.
    #[must_use]
    pub fn build(product: &ProductDetail, shop_base_url: &str, utm_query: &str) -> Self {
        let mut url = format!("{shop_base_url}/products/{}", product.handle);
        if !utm_query.is_empty() {
            url.push('?');
            url.push_str(utm_query);
        }

        let primary_image = product
            .images
            .first()
            .map(|image| card_image(image, &product.title))
            .or_else(|| {
                cheapest_variant_image(&product.variants).map(|image| card_image(image, &product.title))
            });
        let secondary_image = product.images.get(1).map(|image| {
            card_image(
                image,
                primary_image
                    .as_ref()
                    .map_or(product.title.as_str(), |primary| primary.alt.as_str()),
            )
        });

        let price = product
            .min_price
            .as_ref()
            .and_then(|money| money.to_price())
            .unwrap_or_else(|| Price::new(Decimal::ZERO, "USD"))
            .display();

        let (swatches, extra_swatches) = build_swatches(product);

        Self {
            url,
            title: product.title.clone(),
            primary_image,
            secondary_image,
            price,
            swatches,
            extra_swatches,
        }
    }
}

fn card_image(image: &Image, fallback_alt: &str) -> CardImage {
    CardImage {
        url: image.url.clone(),
        alt: image
            .alt_text
            .clone()
            .unwrap_or_else(|| fallback_alt.to_string()),
    }
}

/// Image of the lowest-priced variant that has one.
fn cheapest_variant_image(variants: &[Variant]) -> Option<&Image> {
    variants
        .iter()
        .filter_map(|variant| {
            let image = variant.image.as_ref()?;
            let price = variant.price.to_price()?.amount;
            Some((price, image))
        })
        .min_by(|(a, _), (b, _)| a.cmp(b))
        .map(|(_, image)| image)
}

fn build_swatches(product: &ProductDetail) -> (Vec<CardSwatch>, usize) {
    let Some(color_option) = product.color_option() else {
        return (Vec::new(), 0);
    };

    // First image per color value, in variant order
    let mut variant_images: HashMap<&str, CardImage> = HashMap::new();
    for variant in &product.variants {
        let Some(color) = variant
            .selected_options
            .iter()
            .find(|option| option.name.eq_ignore_ascii_case("color"))
        else {
            continue;
        };
        if let Some(image) = &variant.image {
            variant_images
                .entry(color.value.as_str())
                .or_insert_with(|| card_image(image, &product.title));
        }
    }

    let swatches = color_option
        .values
        .iter()
        .take(MAX_SWATCHES)
        .filter_map(|value| {
            let swatch = value.swatch.as_ref()?;
            let style = if let Some(url) = &swatch.image_url {
                format!("background-image: url('{}');", css_url(url))
            } else {
                format!(
                    "background-color: {};",
                    swatch.color.as_deref().and_then(sanitize_css_color)?
                )
            };
            Some(CardSwatch {
                label: value.name.clone(),
                style,
                variant_image: variant_images.get(value.name.as_str()).cloned(),
            })
        })
        .collect();

    (
        swatches,
        color_option.values.len().saturating_sub(MAX_SWATCHES),
    )
}

/// Keep a color value only if it is made of characters that cannot escape a
/// CSS declaration (hex, names, `rgb()`/`hsl()` notation).
#[must_use]
pub fn sanitize_css_color(value: &str) -> Option<String> {
    let value = value.trim();
    let safe = !value.is_empty()
        && value.len() <= 64
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '#' | '(' | ')' | ',' | '.' | '%' | ' ' | '-'));
    safe.then(|| value.to_string())
}

/// Drop characters that could terminate a quoted CSS `url()`.
fn css_url(url: &str) -> String {
    url.chars()
        .filter(|c| !matches!(c, '\'' | '"' | '\\' | '(' | ')' | '\n' | '\r'))
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use serde_json::json;

    use super::*;

    fn product(value: serde_json::Value) -> ProductDetail {
        serde_json::from_value(value).unwrap()
    }

    fn variant(id: u32, price: &str, color: &str, image: Option<&str>) -> serde_json::Value {
        json!({
            "id": format!("gid://shopify/ProductVariant/{id}"),
            "title": color,
            "price": { "amount": price, "currencyCode": "USD" },
            "image": image.map(|url| json!({ "url": url })),
            "selectedOptions": [{ "name": "Color", "value": color }]
        })
    }

    #[test]
    fn test_url_and_price() {
        let card = ProductCard::build(
            &product(json!({
                "id": "gid://shopify/Product/1",
                "title": "Tote",
                "handle": "tote",
                "minPrice": { "amount": "1200", "currencyCode": "GBP" }
            })),
            "https://demo.myshopify.com",
            "utm_source=blog",
        );
        assert_eq!(card.url, "https://demo.myshopify.com/products/tote?utm_source=blog");
        assert_eq!(card.price, "£1,200.00");
        assert!(card.primary_image.is_none());
    }

    #[test]
    fn test_missing_price_shows_zero() {
        let card = ProductCard::build(
            &product(json!({ "id": "1", "title": "Free", "handle": "free" })),
            "https://demo.myshopify.com",
            "",
        );
        assert_eq!(card.url, "https://demo.myshopify.com/products/free");
        assert_eq!(card.price, "$0.00");
    }

    #[test]
    fn test_images_primary_secondary_and_alt_fallback() {
        let card = ProductCard::build(
            &product(json!({
                "id": "1", "title": "Cap", "handle": "cap",
                "images": [
                    { "url": "https://cdn.test/a.jpg", "altText": "Front" },
                    { "url": "https://cdn.test/b.jpg" }
                ]
            })),
            "https://demo.myshopify.com",
            "",
        );
        assert_eq!(card.primary_image.as_ref().unwrap().alt, "Front");
        let secondary = card.secondary_image.unwrap();
        assert_eq!(secondary.url, "https://cdn.test/b.jpg");
        assert_eq!(secondary.alt, "Front");
    }

    #[test]
    fn test_cheapest_variant_image_used_without_product_images() {
        let card = ProductCard::build(
            &product(json!({
                "id": "1", "title": "Mug", "handle": "mug",
                "variants": [
                    variant(1, "30.00", "Red", Some("https://cdn.test/red.jpg")),
                    variant(2, "12.50", "Blue", Some("https://cdn.test/blue.jpg")),
                    variant(3, "5.00", "Green", None)
                ]
            })),
            "https://demo.myshopify.com",
            "",
        );
        assert_eq!(card.primary_image.unwrap().url, "https://cdn.test/blue.jpg");
    }

    #[test]
    fn test_swatches_limited_with_overflow_and_variant_images() {
        let values: Vec<_> = ["Red", "Blue", "Green", "Black", "White", "Pink", "Gold"]
            .iter()
            .map(|name| json!({ "name": name, "swatch": { "color": "#112233" } }))
            .collect();
        let card = ProductCard::build(
            &product(json!({
                "id": "1", "title": "Sock", "handle": "sock",
                "options": [{ "id": "o1", "name": "COLOR", "values": values }],
                "variants": [
                    variant(1, "5", "Blue", Some("https://cdn.test/blue-1.jpg")),
                    variant(2, "5", "Blue", Some("https://cdn.test/blue-2.jpg"))
                ]
            })),
            "https://demo.myshopify.com",
            "",
        );
        assert_eq!(card.swatches.len(), MAX_SWATCHES);
        assert_eq!(card.extra_swatches, 2);
        assert_eq!(card.swatches[0].style, "background-color: #112233;");
        assert!(card.swatches[0].variant_image.is_none());
        assert_eq!(
            card.swatches[1].variant_image.as_ref().unwrap().url,
            "https://cdn.test/blue-1.jpg"
        );
    }

    #[test]
    fn test_swatch_without_visual_is_skipped() {
        let card = ProductCard::build(
            &product(json!({
                "id": "1", "title": "Hat", "handle": "hat",
                "options": [{ "id": "o1", "name": "Color", "values": [
                    { "name": "Plain", "swatch": null },
                    { "name": "Evil", "swatch": { "color": "red;} body{display:none" } },
                    { "name": "Photo", "swatch": { "imageUrl": "https://cdn.test/s.png')" } }
                ] }]
            })),
            "https://demo.myshopify.com",
            "",
        );
        assert_eq!(card.swatches.len(), 1);
        assert_eq!(
            card.swatches[0].style,
            "background-image: url('https://cdn.test/s.png');"
        );
    }

    #[test]
    fn test_sanitize_css_color() {
        assert_eq!(sanitize_css_color(" #fff ").as_deref(), Some("#fff"));
        assert_eq!(
            sanitize_css_color("rgba(0, 0, 0, 0.5)").as_deref(),
            Some("rgba(0, 0, 0, 0.5)")
        );
        assert!(sanitize_css_color("red;background:url(x)").is_none());
        assert!(sanitize_css_color("</style>").is_none());
        assert!(sanitize_css_color("").is_none());
    }
}
