//! Page selection: configured page list → ordered, de-duplicated page numbers.
//!
//! Selection keeps the **first occurrence** of every page number in the order
//! the config declares them and drops later repeats without reordering. The
//! numbers stay 1-based because the page tool takes them verbatim.

use crate::config::PageSpec;
use serde::Serialize;
use std::collections::HashSet;
use std::fmt;

/// Which field of a [`PageSpec`] supplied the effective page number.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRef {
    /// Taken from `pageIndex` (highest precedence).
    PageIndex(u32),
    /// Taken from `page`.
    Page(u32),
}

impl PageRef {
    /// The 1-based page number, unmodified.
    pub fn number(self) -> u32 {
        match self {
            PageRef::PageIndex(n) | PageRef::Page(n) => n,
        }
    }
}

impl PageSpec {
    /// Effective page reference: `pageIndex`, else `page`.
    ///
    /// `pageNumber` is deliberately not part of the chain; an entry that only
    /// carries `pageNumber` selects nothing.
    pub fn page_ref(&self) -> Option<PageRef> {
        self.page_index
            .map(PageRef::PageIndex)
            .or(self.page.map(PageRef::Page))
    }
}

/// Ordered, unique, 1-based page numbers of the input PDF.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct SelectedPages(Vec<u32>);

impl SelectedPages {
    pub fn as_slice(&self) -> &[u32] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_vec(self) -> Vec<u32> {
        self.0
    }
}

impl fmt::Display for SelectedPages {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u32::to_string).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}

/// Select pages from the configured list.
pub fn select_pages(specs: &[PageSpec]) -> SelectedPages {
    let mut seen = HashSet::with_capacity(specs.len());
    let pages = specs
        .iter()
        .filter_map(PageSpec::page_ref)
        .map(PageRef::number)
        .filter(|n| seen.insert(*n))
        .collect();
    SelectedPages(pages)
}
