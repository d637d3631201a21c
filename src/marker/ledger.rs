//! Style ledger
//!
//! Remembers the inline style each selector's element had before it was
//! highlighted. Keys are canonical selectors, so `{name: "q"}` and
//! `By::name("q")` refer to the same entry.

use crate::selector::Selector;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Inline style captured from an element
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind", content = "style")]
pub enum OriginalStyle {
    /// No `style` attribute
    Absent,
    /// `style` attribute with this value, possibly empty
    Inline(String),
}

impl OriginalStyle {
    /// Convert the value returned by `getAttribute('style')`
    pub fn from_attribute(value: Option<String>) -> Self {
        match value {
            Some(style) => OriginalStyle::Inline(style),
            None => OriginalStyle::Absent,
        }
    }

    pub fn as_attribute(&self) -> Option<&str> {
        match self {
            OriginalStyle::Absent => None,
            OriginalStyle::Inline(style) => Some(style),
        }
    }

    pub fn is_absent(&self) -> bool {
        matches!(self, OriginalStyle::Absent)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleRecord {
    pub selector: Selector,
    pub original_style: OriginalStyle,
    /// True while the element carries a highlight applied by the marker
    pub highlighted: bool,
}

#[derive(Debug, Default)]
pub struct StyleLedger {
    records: HashMap<Selector, StyleRecord>,
}

impl StyleLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, selector: &Selector) -> Option<&StyleRecord> {
        self.records.get(&selector.canonical())
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &StyleRecord> {
        self.records.values()
    }

    /// Record a freshly applied highlight
    ///
    /// While a highlight is already active the first captured original is
    /// kept; `captured` would be the highlighted style in that case.
    pub fn record_highlight(&mut self, selector: &Selector, captured: OriginalStyle) {
        let key = selector.canonical();

        if let Some(existing) = self.records.get(&key) {
            if existing.highlighted {
                log::debug!(
                    "{} already highlighted, keeping original style {:?}",
                    key,
                    existing.original_style
                );
                return;
            }
        }

        self.replace(
            key.clone(),
            StyleRecord {
                selector: key,
                original_style: captured,
                highlighted: true,
            },
        );
    }

    /// Record that the element's style was put back to `restored`
    pub fn record_restored(&mut self, selector: &Selector, restored: OriginalStyle) {
        let key = selector.canonical();
        self.replace(
            key.clone(),
            StyleRecord {
                selector: key,
                original_style: restored,
                highlighted: false,
            },
        );
    }

    fn replace(&mut self, key: Selector, record: StyleRecord) {
        if self.records.remove(&key).is_some() {
            log::debug!("Replacing style record for {}", key);
        }
        self.records.insert(key, record);
    }
}
