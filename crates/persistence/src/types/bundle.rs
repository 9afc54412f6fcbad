//! Searchset envelope for search results.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::core::SearchResult;
use crate::error::StorageResult;

use super::SearchQuery;

/// A searchset bundle: one page of matches plus navigation links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchBundle {
    /// Always "Bundle".
    #[serde(rename = "resourceType")]
    pub resource_type: String,

    /// The bundle type (always "searchset").
    #[serde(rename = "type")]
    pub bundle_type: String,

    /// Size of the full filtered set, not just this page.
    pub total: u64,

    /// Navigation links.
    pub link: Vec<BundleLink>,

    /// The page of matches.
    pub entry: Vec<BundleEntry>,
}

/// A link in a search bundle.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleLink {
    /// The relation type (self, next, previous).
    pub relation: String,

    /// The URL.
    pub url: String,
}

/// An entry in a search bundle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BundleEntry {
    /// Absolute URL of the resource.
    #[serde(rename = "fullUrl")]
    pub full_url: String,

    /// The stored payload.
    pub resource: Value,

    /// Why the entry is in the bundle.
    pub search: BundleEntrySearch,
}

/// Search information for a bundle entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BundleEntrySearch {
    /// Match mode.
    pub mode: SearchEntryMode,
}

/// How a bundle entry matched the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchEntryMode {
    /// This is a match to the search parameters.
    Match,
}

impl SearchBundle {
    /// Creates an empty searchset.
    pub fn new(total: u64) -> Self {
        Self {
            resource_type: "Bundle".to_string(),
            bundle_type: "searchset".to_string(),
            total,
            link: Vec::new(),
            entry: Vec::new(),
        }
    }

    /// Wraps a search page in a navigable searchset.
    ///
    /// `self` is always present. `next` is present while matches remain past
    /// this page; `previous` whenever the page does not start at zero, and
    /// is clamped at offset 0. Every link repeats all filters of `query`.
    pub fn assemble(result: &SearchResult, query: &SearchQuery, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        let page_size = query.page_size;
        let offset = query.offset;

        let mut bundle = Self::new(result.total)
            .with_link("self", query.to_link(base, offset));

        let next = offset.saturating_add(page_size);
        if (next as u64) < result.total {
            bundle = bundle.with_link("next", query.to_link(base, next));
        }
        if offset > 0 {
            bundle = bundle.with_link("previous", query.to_link(base, offset.saturating_sub(page_size)));
        }

        for resource in &result.resources {
            bundle = bundle.with_entry(BundleEntry::match_entry(
                format!("{}/{}", base, resource.url()),
                resource.content().clone(),
            ));
        }

        bundle
    }

    /// Adds a link.
    pub fn with_link(mut self, relation: impl Into<String>, url: impl Into<String>) -> Self {
        self.link.push(BundleLink {
            relation: relation.into(),
            url: url.into(),
        });
        self
    }

    /// Adds an entry.
    pub fn with_entry(mut self, entry: BundleEntry) -> Self {
        self.entry.push(entry);
        self
    }

    /// Returns the URL of the link with the given relation.
    pub fn link_url(&self, relation: &str) -> Option<&str> {
        self.link
            .iter()
            .find(|l| l.relation == relation)
            .map(|l| l.url.as_str())
    }

    /// Serializes the bundle in its wire shape.
    pub fn to_json(&self) -> StorageResult<Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl BundleEntry {
    /// Creates a new match entry.
    pub fn match_entry(full_url: impl Into<String>, resource: Value) -> Self {
        Self {
            full_url: full_url.into(),
            resource,
            search: BundleEntrySearch {
                mode: SearchEntryMode::Match,
            },
        }
    }
}
