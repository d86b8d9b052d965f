//! Cache key scheme.
//!
//! Every entry written for a source file is keyed off its resource
//! identifier: the network location plus path of the source URL, with the
//! scheme, query string and fragment dropped. Two URLs that differ only in
//! query parameters therefore share one set of cache entries.
//!
//! The identifier is cut from the URL text as given. Host case, explicit
//! ports and dot-segments are kept, so it matches the raw path a client
//! sends when retrieving.
//!
//! ```text
//! https://data.example.com/cogs/scene.tif?token=abc
//!         └──────────── identifier ───────┘
//!
//! data.example.com/cogs/scene.tif          metadata (JSON)
//! data.example.com/cogs/scene.tif@0        header prefix
//! data.example.com/cogs/scene.tif@81920    tile starting at byte 81920
//! ```

use std::fmt;

use url::Url;

use crate::error::IoError;

/// Separator between the identifier and a byte offset.
const OFFSET_SEPARATOR: char = '@';

/// Identifiers that would be shadowed by fixed server routes.
pub const RESERVED_IDENTIFIERS: &[&str] = &["health"];

/// Root of all cache keys for one source file.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    identifier: String,
}

impl ResourceKey {
    /// Derive the key root from a source URL.
    ///
    /// # Errors
    /// `InvalidUrl` if the URL does not parse, is not http(s), has no host,
    /// or its identifier is reserved.
    pub fn from_url(url: &str) -> Result<Self, IoError> {
        let invalid = |reason: &str| IoError::InvalidUrl {
            url: url.to_string(),
            reason: reason.to_string(),
        };

        let parsed = Url::parse(url).map_err(|e| invalid(&e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(invalid("only http and https sources are supported"));
        }
        if parsed.host_str().is_none() {
            return Err(invalid("missing host"));
        }

        // The parsed form only validates; the key keeps the caller's spelling
        let (_, rest) = url
            .trim()
            .split_once("://")
            .ok_or_else(|| invalid("missing network location"))?;
        let end = rest.find(['?', '#']).unwrap_or(rest.len());
        let identifier = &rest[..end];

        if RESERVED_IDENTIFIERS.contains(&identifier) {
            return Err(invalid("identifier is reserved by a server route"));
        }

        Ok(Self {
            identifier: identifier.to_string(),
        })
    }

    /// Wrap an identifier received on the retrieval path.
    pub fn from_identifier(identifier: impl Into<String>) -> Self {
        Self {
            identifier: identifier.into(),
        }
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    /// Key of the JSON metadata entry.
    pub fn metadata_key(&self) -> &str {
        &self.identifier
    }

    /// Key of the cached header prefix (it starts at byte 0).
    pub fn header_key(&self) -> String {
        self.tile_key(0)
    }

    /// Key of the tile starting at `offset`.
    pub fn tile_key(&self, offset: u64) -> String {
        format!("{}{}{}", self.identifier, OFFSET_SEPARATOR, offset)
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.identifier)
    }
}
