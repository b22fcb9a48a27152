//! Shopify global identifiers (`gid://shopify/<Type>/<id>`).

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

const GID_PREFIX: &str = "gid://shopify/";

/// Resource types addressed by the showcase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GidKind {
    Product,
    Collection,
}

impl GidKind {
    /// The type segment used inside a GID.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Product => "Product",
            Self::Collection => "Collection",
        }
    }
}

/// Error returned for identifiers that are neither a bare numeric id nor a
/// GID of the expected type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid {kind} id: {value:?}")]
pub struct GidError {
    pub kind: &'static str,
    pub value: String,
}

/// A Shopify GID of a known resource type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ShopifyGid(String);

impl ShopifyGid {
    /// Normalize a product or collection id.
    ///
    /// A bare numeric id becomes `gid://shopify/{Kind}/{id}`; a full GID is
    /// accepted when its type segment matches `kind`.
    ///
    /// # Errors
    ///
    /// Returns `GidError` for empty input, non-numeric bare ids, or GIDs of a
    /// different resource type.
    pub fn normalize(kind: GidKind, id: &str) -> Result<Self, GidError> {
        let id = id.trim();
        let err = || GidError {
            kind: kind.as_str(),
            value: id.to_string(),
        };

        if let Some(rest) = id.strip_prefix(GID_PREFIX) {
            let (type_segment, numeric) = rest.split_once('/').ok_or_else(err)?;
            if type_segment != kind.as_str() || numeric.is_empty() || numeric.contains('/') {
                return Err(err());
            }
            return Ok(Self(id.to_string()));
        }

        if !id.is_empty() && id.bytes().all(|b| b.is_ascii_digit()) {
            return Ok(Self(format!("{GID_PREFIX}{}/{id}", kind.as_str())));
        }

        Err(err())
    }

    /// The full GID string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The trailing id segment (e.g. `123` for `gid://shopify/Product/123`).
    #[must_use]
    pub fn numeric_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or_default()
    }
}

impl fmt::Display for ShopifyGid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
