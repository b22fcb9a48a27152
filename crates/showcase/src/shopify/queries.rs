//! GraphQL documents for the Shopify Admin API and their response shapes.
//!
//! Documents are fixed strings; every caller-supplied value travels in
//! `variables`. Request bodies use `graphql_client::QueryBody` so the wire
//! format matches generated operations.

use graphql_client::QueryBody;
use products_showcase_core::{ApiVersion, ShopifyGid};
use serde::Deserialize;
use serde_json::{Value, json};

use super::types::{Money, ProductStatus, SelectedOption};

/// Minimum search term length, in characters.
pub const MIN_SEARCH_TERM_CHARS: usize = 2;

/// Versions from this one on expose `productsCount` as a `Count` object.
const PRODUCTS_COUNT_OBJECT_SINCE: &str = "2024-04";

pub const SHOP_NAME: &str = r"
query ShopName {
  shop {
    name
  }
}
";

pub const PUBLIC_API_VERSIONS: &str = r"
query PublicApiVersions {
  publicApiVersions {
    handle
    supported
  }
}
";

pub const SEARCH_PRODUCTS: &str = r"
query SearchProducts($query: String!) {
  products(first: 10, query: $query) {
    edges {
      node {
        id
        title
        handle
        featuredImage {
          url(transform: {maxWidth: 50, maxHeight: 50})
        }
        priceRangeV2 {
          minVariantPrice {
            amount
            currencyCode
          }
        }
      }
    }
  }
}
";

pub const SEARCH_COLLECTIONS: &str = r"
query SearchCollections($query: String!) {
  collections(first: 10, query: $query) {
    edges {
      node {
        id
        title
        handle
        image {
          url(transform: {maxWidth: 50, maxHeight: 50})
        }
        productsCount {
          count
        }
      }
    }
  }
}
";

pub const SEARCH_COLLECTIONS_LEGACY: &str = r"
query SearchCollections($query: String!) {
  collections(first: 10, query: $query) {
    edges {
      node {
        id
        title
        handle
        image {
          url(transform: {maxWidth: 50, maxHeight: 50})
        }
        productsCount
      }
    }
  }
}
";

pub const PRODUCT: &str = r"
query Product($id: ID!) {
  product(id: $id) {
    id
    title
    handle
    description
    productType
    hasOutOfStockVariants
    status
    priceRangeV2 {
      minVariantPrice {
        amount
        currencyCode
      }
    }
    options {
      id
      name
      optionValues {
        name
        swatch {
          color
          image {
            image {
              url
            }
          }
        }
      }
    }
    images(first: 10) {
      edges {
        node {
          id
          url
          altText
        }
      }
    }
    variants(first: 50) {
      edges {
        node {
          id
          title
          price
          compareAtPrice
          sku
          image {
            url
            altText
          }
          selectedOptions {
            name
            value
          }
        }
      }
    }
  }
}
";

pub const COLLECTION: &str = r"
query Collection($id: ID!) {
  collection(id: $id) {
    id
    title
    handle
    image {
      url
    }
  }
}
";

pub const COLLECTION_PRODUCTS: &str = r"
query CollectionProducts($id: ID!, $first: Int!) {
  collection(id: $id) {
    products(first: $first) {
      edges {
        node {
          id
          title
          handle
          description
          productType
          hasOutOfStockVariants
          status
          priceRangeV2 {
            minVariantPrice {
              amount
              currencyCode
            }
          }
          images(first: 5) {
            edges {
              node {
                id
                url
                altText
              }
            }
          }
          options {
            id
            name
            optionValues {
              name
              swatch {
                color
                image {
                  image {
                    url
                  }
                }
              }
            }
          }
          variants(first: 20) {
            edges {
              node {
                id
                title
                price
                image {
                  url
                  altText
                }
                selectedOptions {
                  name
                  value
                }
              }
            }
          }
        }
      }
    }
  }
}
";

// =============================================================================
// Request builders
// =============================================================================

fn body(query: &'static str, operation_name: &'static str, variables: Value) -> QueryBody<Value> {
    QueryBody {
        variables,
        query,
        operation_name,
    }
}

/// Strip quotes and backslashes and trim. Returns `None` when fewer than
/// [`MIN_SEARCH_TERM_CHARS`] characters remain.
#[must_use]
pub fn sanitize_search_term(term: &str) -> Option<String> {
    let cleaned: String = term.chars().filter(|c| !matches!(c, '"' | '\\')).collect();
    let cleaned = cleaned.trim();
    (cleaned.chars().count() >= MIN_SEARCH_TERM_CHARS).then(|| cleaned.to_string())
}

/// Title wildcard filter for a sanitized term.
#[must_use]
pub fn title_filter(term: &str) -> String {
    format!("title:*{term}*")
}

#[must_use]
pub fn shop_name() -> QueryBody<Value> {
    body(SHOP_NAME, "ShopName", json!({}))
}

#[must_use]
pub fn public_api_versions() -> QueryBody<Value> {
    body(PUBLIC_API_VERSIONS, "PublicApiVersions", json!({}))
}

#[must_use]
pub fn search_products(term: &str) -> QueryBody<Value> {
    body(
        SEARCH_PRODUCTS,
        "SearchProducts",
        json!({ "query": title_filter(term) }),
    )
}

/// Collection search shaped for the API version in use.
#[must_use]
pub fn search_collections(term: &str, version: &ApiVersion) -> QueryBody<Value> {
    let document = if version.is_at_least(PRODUCTS_COUNT_OBJECT_SINCE) {
        SEARCH_COLLECTIONS
    } else {
        SEARCH_COLLECTIONS_LEGACY
    };
    body(
        document,
        "SearchCollections",
        json!({ "query": title_filter(term) }),
    )
}

#[must_use]
pub fn product(id: &ShopifyGid) -> QueryBody<Value> {
    body(PRODUCT, "Product", json!({ "id": id.as_str() }))
}

#[must_use]
pub fn collection(id: &ShopifyGid) -> QueryBody<Value> {
    body(COLLECTION, "Collection", json!({ "id": id.as_str() }))
}

#[must_use]
pub fn collection_products(id: &ShopifyGid, first: u32) -> QueryBody<Value> {
    body(
        COLLECTION_PRODUCTS,
        "CollectionProducts",
        json!({ "id": id.as_str(), "first": first }),
    )
}

// =============================================================================
// Response shapes
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub edges: Vec<Edge<T>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { edges: Vec::new() }
    }
}

impl<T> Connection<T> {
    pub fn into_nodes(self) -> impl Iterator<Item = T> {
        self.edges.into_iter().map(|edge| edge.node)
    }
}

#[derive(Debug, Deserialize)]
pub struct Edge<T> {
    pub node: T,
}

#[derive(Debug, Deserialize)]
pub struct UrlOnly {
    pub url: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriceRange {
    pub min_variant_price: Option<Money>,
}

#[derive(Debug, Deserialize)]
pub struct ShopNameData {
    pub shop: ShopNameNode,
}

#[derive(Debug, Deserialize)]
pub struct ShopNameNode {
    pub name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicApiVersionsData {
    #[serde(default)]
    pub public_api_versions: Vec<ApiVersionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct ApiVersionEntry {
    pub handle: String,
    #[serde(default)]
    pub supported: bool,
}

/// Body of the REST `/admin/api.json` endpoint.
#[derive(Debug, Deserialize)]
pub struct RestApiVersions {
    #[serde(default)]
    pub supported_api_versions: Vec<RestApiVersionEntry>,
}

#[derive(Debug, Deserialize)]
pub struct RestApiVersionEntry {
    pub handle: String,
    #[serde(default)]
    pub supported: bool,
    #[serde(default)]
    pub latest_supported: bool,
}

#[derive(Debug, Deserialize)]
pub struct SearchProductsData {
    pub products: Connection<ProductSummaryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSummaryNode {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub featured_image: Option<UrlOnly>,
    pub price_range_v2: Option<PriceRange>,
}

#[derive(Debug, Deserialize)]
pub struct SearchCollectionsData {
    pub collections: Connection<CollectionSummaryNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollectionSummaryNode {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub image: Option<UrlOnly>,
    #[serde(default)]
    pub products_count: Option<ProductsCount>,
}

/// `productsCount` is a `Count` object on newer API versions and a bare
/// integer on older ones.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum ProductsCount {
    Object { count: u64 },
    Scalar(u64),
}

impl ProductsCount {
    #[must_use]
    pub const fn value(&self) -> u64 {
        match self {
            Self::Object { count } | Self::Scalar(count) => *count,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ProductData {
    pub product: Option<ProductNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionData {
    pub collection: Option<CollectionNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionNode {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub image: Option<UrlOnly>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProductsData {
    pub collection: Option<CollectionProductsNode>,
}

#[derive(Debug, Deserialize)]
pub struct CollectionProductsNode {
    #[serde(default)]
    pub products: Connection<ProductNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductNode {
    pub id: String,
    pub title: String,
    pub handle: String,
    pub description: Option<String>,
    pub product_type: Option<String>,
    pub has_out_of_stock_variants: Option<bool>,
    pub status: Option<ProductStatus>,
    pub price_range_v2: Option<PriceRange>,
    #[serde(default)]
    pub options: Vec<OptionNode>,
    #[serde(default)]
    pub images: Connection<ImageNode>,
    #[serde(default)]
    pub variants: Connection<VariantNode>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageNode {
    pub id: Option<String>,
    pub url: String,
    pub alt_text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OptionNode {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub option_values: Vec<OptionValueNode>,
}

#[derive(Debug, Deserialize)]
pub struct OptionValueNode {
    pub name: String,
    pub swatch: Option<SwatchNode>,
}

#[derive(Debug, Deserialize)]
pub struct SwatchNode {
    pub color: Option<String>,
    pub image: Option<MediaImageNode>,
}

#[derive(Debug, Deserialize)]
pub struct MediaImageNode {
    pub image: Option<UrlOnly>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VariantNode {
    pub id: String,
    pub title: String,
    pub price: Option<String>,
    #[serde(default)]
    pub compare_at_price: Option<String>,
    #[serde(default)]
    pub sku: Option<String>,
    pub image: Option<ImageNode>,
    #[serde(default)]
    pub selected_options: Vec<SelectedOption>,
}
