//! Server-side block rendering.
//!
//! A block is described by [`BlockAttributes`] (as saved by the block editor)
//! and rendered to an HTML fragment: a carousel for several products, a
//! single-product layout for one, and nothing (frontend) or a placeholder
//! (preview) when no product is available.

mod card;

pub use card::{CardImage, CardSwatch, MAX_SWATCHES, ProductCard, sanitize_css_color};

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use askama::Template;
use serde::Deserialize;
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{instrument, warn};

use crate::db::{RepositoryError, Settings};
use crate::shopify::{COLLECTION_PRODUCTS_DEFAULT_LIMIT, Catalog, ProductDetail};

const DEFAULT_PLACEHOLDER_TITLE: &str = "Your Product Showcase";
const DEFAULT_PLACEHOLDER_DESCRIPTION: &str =
    "Add products or a collection to see them displayed here";
const DEFAULT_CTA_TITLE: &str = "View All";

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("template error: {0}")]
    Template(#[from] askama::Error),

    #[error(transparent)]
    Settings(#[from] RepositoryError),
}

// =============================================================================
// Attributes
// =============================================================================

/// Where the block's products come from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContentType {
    #[default]
    Products,
    Collection,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProductListItem {
    pub product_id: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CtaButton {
    pub url: String,
    pub title: String,
    pub opens_in_new_tab: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockColors {
    pub background_color: String,
    pub text_color: String,
    pub button_background: String,
    pub button_text: String,
    pub button_background_hover: String,
    pub button_text_hover: String,
}

/// Saved block configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BlockAttributes {
    pub title: String,
    pub description: String,
    pub content_type: ContentType,
    pub product_list: Vec<ProductListItem>,
    pub collection_id: String,
    pub product_limit: u32,
    pub disable_global_padding: bool,
    pub cta_button: CtaButton,
    pub colors: BlockColors,
}

impl Default for BlockAttributes {
    fn default() -> Self {
        Self {
            title: String::new(),
            description: String::new(),
            content_type: ContentType::default(),
            product_list: Vec::new(),
            collection_id: String::new(),
            product_limit: COLLECTION_PRODUCTS_DEFAULT_LIMIT,
            disable_global_padding: false,
            cta_button: CtaButton::default(),
            colors: BlockColors::default(),
        }
    }
}

/// Public page view or editor preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    /// Hides non-public products and renders nothing when empty.
    Frontend,
    /// Shows every product and a placeholder when empty.
    Preview,
}

// =============================================================================
// Templates
// =============================================================================

pub struct CtaLink {
    pub url: String,
    pub title: String,
    pub new_tab: bool,
}

#[derive(Template)]
#[template(path = "blocks/showcase.html")]
struct ShowcaseTemplate {
    block_id: String,
    wrapper_class: String,
    wrapper_style: Option<String>,
    button_class: String,
    button_css: Option<String>,
    title: String,
    description: String,
    cta: Option<CtaLink>,
    shop_url: String,
    cards: Vec<ProductCard>,
}

#[derive(Template)]
#[template(path = "blocks/placeholder.html")]
struct PlaceholderTemplate {
    block_id: String,
    title: String,
    description: String,
    cta_title: String,
    message: &'static str,
    hint: &'static str,
}

// =============================================================================
// Renderer
// =============================================================================

/// Renders blocks from the live catalog.
#[derive(Clone)]
pub struct Renderer {
    catalog: Catalog,
    settings: Settings,
    next_id: Arc<AtomicU64>,
}

impl Renderer {
    #[must_use]
    pub fn new(catalog: Catalog, settings: Settings) -> Self {
        Self {
            catalog,
            settings,
            next_id: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Render a block to an HTML fragment.
    ///
    /// Products that fail to load are logged and left out rather than
    /// failing the whole block.
    ///
    /// # Errors
    ///
    /// Returns `RenderError` if settings cannot be read or a template fails.
    #[instrument(skip(self, attrs), fields(content_type = ?attrs.content_type))]
    pub async fn render(
        &self,
        attrs: &BlockAttributes,
        mode: RenderMode,
    ) -> Result<String, RenderError> {
        let block_id = format!(
            "showcase-block-{}",
            self.next_id.fetch_add(1, Ordering::Relaxed) + 1
        );

        let shop = self.settings.shop_domain().await?;
        let mut products = match &shop {
            Some(_) => self.load_products(attrs).await,
            None => Vec::new(),
        };
        if mode == RenderMode::Frontend {
            products.retain(|product| product.status.is_publicly_visible());
        }

        let Some(shop) = shop.filter(|_| !products.is_empty()) else {
            return match mode {
                RenderMode::Frontend => Ok(String::new()),
                RenderMode::Preview => Ok(placeholder(attrs, block_id).render()?),
            };
        };

        let shop_url = shop.base_url();
        let utm_query = self.settings.utm().await?.query_string();
        let cards = products
            .iter()
            .map(|product| ProductCard::build(product, &shop_url, &utm_query))
            .collect();

        let button_class = format!("showcase-cta-{}", short_hash(&block_id));
        let template = ShowcaseTemplate {
            wrapper_class: wrapper_class(attrs),
            wrapper_style: wrapper_style(&attrs.colors),
            button_css: button_css(&block_id, &button_class, &attrs.colors),
            button_class,
            block_id,
            title: attrs.title.clone(),
            description: attrs.description.clone(),
            cta: cta_link(&attrs.cta_button),
            shop_url,
            cards,
        };
        Ok(template.render()?)
    }

    async fn load_products(&self, attrs: &BlockAttributes) -> Vec<ProductDetail> {
        match attrs.content_type {
            ContentType::Collection => {
                let id = attrs.collection_id.trim();
                if id.is_empty() {
                    return Vec::new();
                }
                self.catalog
                    .fetch_collection_products(id, attrs.product_limit)
                    .await
                    .unwrap_or_else(|e| {
                        warn!(error = %e, collection_id = id, "Failed to load collection products");
                        Vec::new()
                    })
            }
            ContentType::Products => {
                let mut products = Vec::with_capacity(attrs.product_list.len());
                for item in &attrs.product_list {
                    let id = item.product_id.trim();
                    if id.is_empty() {
                        continue;
                    }
                    match self.catalog.fetch_product(id).await {
                        Ok(Some(product)) => products.push(product),
                        Ok(None) => warn!(product_id = id, "Product not found"),
                        Err(e) => warn!(error = %e, product_id = id, "Failed to load product"),
                    }
                }
                products
            }
        }
    }
}

fn placeholder(attrs: &BlockAttributes, block_id: String) -> PlaceholderTemplate {
    let (message, hint) = match attrs.content_type {
        ContentType::Products => (
            "No products selected yet",
            "Use the sidebar to search and add products →",
        ),
        ContentType::Collection => (
            "No collection selected yet",
            "Use the sidebar to select a collection →",
        ),
    };

    PlaceholderTemplate {
        block_id,
        title: or_default(&attrs.title, DEFAULT_PLACEHOLDER_TITLE),
        description: or_default(&attrs.description, DEFAULT_PLACEHOLDER_DESCRIPTION),
        cta_title: or_default(&attrs.cta_button.title, DEFAULT_CTA_TITLE),
        message,
        hint,
    }
}

fn or_default(value: &str, default: &str) -> String {
    let value = value.trim();
    let chosen = if value.is_empty() { default } else { value };
    chosen.to_string()
}

fn short_hash(value: &str) -> String {
    hex::encode(Sha256::digest(value.as_bytes()))
        .chars()
        .take(8)
        .collect()
}

fn wrapper_class(attrs: &BlockAttributes) -> String {
    if attrs.disable_global_padding {
        "showcase-block showcase-no-global-padding".to_string()
    } else {
        "showcase-block".to_string()
    }
}

fn wrapper_style(colors: &BlockColors) -> Option<String> {
    let mut declarations = Vec::new();
    if let Some(background) = sanitize_css_color(&colors.background_color) {
        declarations.push(format!("background-color: {background} !important"));
    }
    if let Some(text) = sanitize_css_color(&colors.text_color) {
        declarations.push(format!("color: {text} !important"));
        declarations.push(format!("--text-color: {text}"));
    }
    (!declarations.is_empty()).then(|| declarations.join("; "))
}

/// Scoped rules for the CTA button, or `None` when no button color is set.
fn button_css(block_id: &str, button_class: &str, colors: &BlockColors) -> Option<String> {
    let rule = |background: &str, text: &str| {
        let mut body = String::new();
        if let Some(background) = sanitize_css_color(background) {
            body.push_str(&format!(" background-color: {background} !important;"));
        }
        if let Some(text) = sanitize_css_color(text) {
            body.push_str(&format!(" color: {text} !important;"));
        }
        body
    };

    let normal = rule(&colors.button_background, &colors.button_text);
    let hover = rule(&colors.button_background_hover, &colors.button_text_hover);
    if normal.is_empty() && hover.is_empty() {
        return None;
    }

    Some(format!(
        "#{block_id} .{button_class} {{{normal} }}\n#{block_id} .{button_class}:hover {{{hover} }}"
    ))
}

fn cta_link(button: &CtaButton) -> Option<CtaLink> {
    let title = button.title.trim();
    let url = safe_href(&button.url)?;
    (!title.is_empty()).then(|| CtaLink {
        url,
        title: title.to_string(),
        new_tab: button.opens_in_new_tab,
    })
}

/// Accept only web links and site-relative paths.
fn safe_href(url: &str) -> Option<String> {
    let url = url.trim();
    let lower = url.to_ascii_lowercase();
    let allowed = lower.starts_with("https://")
        || lower.starts_with("http://")
        || (url.starts_with('/') && !url.starts_with("//"))
        || url.starts_with('#');
    allowed.then(|| url.to_string())
}
