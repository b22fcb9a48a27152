//! Conversions from Admin API response nodes to domain types.

use super::queries::{
    CollectionNode, CollectionSummaryNode, ImageNode, OptionNode, ProductNode, ProductSummaryNode,
    VariantNode,
};
use super::types::{
    CollectionInfo, CollectionSummary, Image, Money, OptionValue, ProductDetail, ProductOption,
    ProductSummary, Swatch, Variant,
};

/// Currency assumed when the product's price range is missing.
const DEFAULT_CURRENCY: &str = "USD";

pub fn convert_product_summary(node: ProductSummaryNode) -> ProductSummary {
    let min_price = node.price_range_v2.and_then(|range| range.min_variant_price);
    let (price, currency) = min_price
        .map(|money| (money.amount, money.currency_code))
        .unwrap_or_default();

    ProductSummary {
        id: node.id,
        title: node.title,
        handle: node.handle,
        image: node.featured_image.map(|image| image.url).unwrap_or_default(),
        price,
        currency,
    }
}

pub fn convert_collection_summary(node: CollectionSummaryNode) -> CollectionSummary {
    CollectionSummary {
        id: node.id,
        title: node.title,
        handle: node.handle,
        image: node.image.map(|image| image.url).unwrap_or_default(),
        products_count: node.products_count.map_or(0, |count| count.value()),
    }
}

pub fn convert_collection(node: CollectionNode) -> CollectionInfo {
    CollectionInfo {
        id: node.id,
        title: node.title,
        handle: node.handle,
        image: node.image.map(|image| image.url).unwrap_or_default(),
    }
}

/// Flatten a product node. Variant prices carry the currency of the
/// product's price range since variants only report a bare amount.
pub fn convert_product(node: ProductNode) -> ProductDetail {
    let min_price = node.price_range_v2.and_then(|range| range.min_variant_price);
    let currency = min_price
        .as_ref()
        .map_or_else(|| DEFAULT_CURRENCY.to_string(), |money| money.currency_code.clone());

    ProductDetail {
        id: node.id,
        title: node.title,
        handle: node.handle,
        description: node.description.unwrap_or_default(),
        product_type: node.product_type.unwrap_or_default(),
        has_out_of_stock_variants: node.has_out_of_stock_variants.unwrap_or(false),
        status: node.status.unwrap_or_default(),
        min_price,
        options: node.options.into_iter().map(convert_option).collect(),
        images: node.images.into_nodes().map(convert_image).collect(),
        variants: node
            .variants
            .into_nodes()
            .map(|variant| convert_variant(variant, &currency))
            .collect(),
    }
}

fn convert_image(node: ImageNode) -> Image {
    Image {
        id: node.id,
        url: node.url,
        alt_text: node.alt_text.filter(|alt| !alt.is_empty()),
    }
}

fn convert_option(node: OptionNode) -> ProductOption {
    ProductOption {
        id: node.id,
        name: node.name,
        values: node
            .option_values
            .into_iter()
            .map(|value| OptionValue {
                name: value.name,
                swatch: value.swatch.and_then(|swatch| {
                    let image_url = swatch
                        .image
                        .and_then(|media| media.image)
                        .map(|image| image.url);
                    let color = swatch.color.filter(|color| !color.is_empty());
                    (color.is_some() || image_url.is_some()).then_some(Swatch { color, image_url })
                }),
            })
            .collect(),
    }
}

fn convert_variant(node: VariantNode, currency: &str) -> Variant {
    let money = |amount: String| Money {
        amount,
        currency_code: currency.to_string(),
    };

    Variant {
        id: node.id,
        title: node.title,
        price: money(node.price.unwrap_or_else(|| "0".to_string())),
        compare_at_price: node
            .compare_at_price
            .filter(|amount| !amount.is_empty())
            .map(money),
        sku: node.sku.filter(|sku| !sku.is_empty()),
        image: node.image.map(convert_image),
        selected_options: node.selected_options,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::shopify::types::ProductStatus;

    fn product_node() -> ProductNode {
        serde_json::from_value(json!({
            "id": "gid://shopify/Product/1",
            "title": "Linen Shirt",
            "handle": "linen-shirt",
            "description": null,
            "productType": "Shirts",
            "hasOutOfStockVariants": false,
            "status": "DRAFT",
            "priceRangeV2": { "minVariantPrice": { "amount": "49.0", "currencyCode": "EUR" } },
            "options": [{
                "id": "gid://shopify/ProductOption/1",
                "name": "Color",
                "optionValues": [
                    { "name": "Sand", "swatch": { "color": "#d2b48c", "image": null } },
                    { "name": "Sky", "swatch": null }
                ]
            }],
            "images": { "edges": [
                { "node": { "id": "gid://shopify/ProductImage/1", "url": "https://cdn.test/1.jpg", "altText": "" } }
            ] },
            "variants": { "edges": [
                { "node": {
                    "id": "gid://shopify/ProductVariant/1",
                    "title": "Sand",
                    "price": "49.0",
                    "compareAtPrice": "59.0",
                    "sku": "",
                    "image": null,
                    "selectedOptions": [{ "name": "Color", "value": "Sand" }]
                } }
            ] }
        }))
        .unwrap()
    }

    #[test]
    fn test_convert_product_flattens_edges() {
        let product = convert_product(product_node());
        assert_eq!(product.status, ProductStatus::Draft);
        assert_eq!(product.description, "");
        assert_eq!(product.images.len(), 1);
        assert!(product.images[0].alt_text.is_none());

        let variant = &product.variants[0];
        assert_eq!(variant.price.currency_code, "EUR");
        assert_eq!(variant.compare_at_price.as_ref().unwrap().amount, "59.0");
        assert!(variant.sku.is_none());
    }

    #[test]
    fn test_convert_option_keeps_swatches_aligned() {
        let product = convert_product(product_node());
        let color = product.color_option().unwrap();
        assert_eq!(color.values.len(), 2);
        assert_eq!(
            color.values[0].swatch.as_ref().unwrap().color.as_deref(),
            Some("#d2b48c")
        );
        assert!(color.values[1].swatch.is_none());
    }

    #[test]
    fn test_convert_summary_without_price_or_image() {
        let node: ProductSummaryNode = serde_json::from_value(json!({
            "id": "gid://shopify/Product/2",
            "title": "Gift Card",
            "handle": "gift-card",
            "featuredImage": null,
            "priceRangeV2": null
        }))
        .unwrap();
        let summary = convert_product_summary(node);
        assert_eq!(summary.image, "");
        assert_eq!(summary.price, "");
    }
}
