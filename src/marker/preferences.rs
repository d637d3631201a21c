//! Highlight Preferences
//!
//! Three layers of preferences decide how a highlight looks: the built-in
//! defaults, the overrides a [`Marker`](super::Marker) was created with, and
//! the overrides passed to a single call. Resolution is a shallow per-field
//! override, highest layer first.

use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

pub const DEFAULT_BACKGROUND: &str = "yellow";
pub const DEFAULT_BORDER: &str = "2px solid red";
pub const DEFAULT_SHOW_FOR: Duration = Duration::from_millis(300);

/// Largest delay `setTimeout` honours; anything above fires immediately
pub const MAX_SHOW_FOR_MS: i64 = i32::MAX as i64;

/// Fully resolved highlight appearance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StylePreferences {
    /// CSS value applied to the inline `background` property
    pub background: String,

    /// CSS border shorthand applied to the inline `border` property
    pub border: String,

    /// Delay before a timed highlight is removed by the page
    pub show_for: Duration,
}

impl Default for StylePreferences {
    fn default() -> Self {
        Self {
            background: DEFAULT_BACKGROUND.to_string(),
            border: DEFAULT_BORDER.to_string(),
            show_for: DEFAULT_SHOW_FOR,
        }
    }
}

impl StylePreferences {
    /// The declarations appended to an element's inline style
    pub fn declarations(&self) -> String {
        format!("background: {}; border: {};", self.background, self.border)
    }

    /// `show_for` in whole milliseconds, as handed to the page's `setTimeout`
    pub fn show_for_ms(&self) -> u64 {
        self.show_for.as_millis().min(u64::MAX as u128) as u64
    }
}

/// Partial preferences, used for both the instance and the per-call layer
///
/// Any field left as `None` falls through to the next layer down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreferenceOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<String>,

    /// Milliseconds. Signed so that a negative value from JSON can be
    /// reported instead of failing to parse.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub show_for: Option<i64>,
}

impl PreferenceOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn background(mut self, background: impl Into<String>) -> Self {
        self.background = Some(background.into());
        self
    }

    pub fn border(mut self, border: impl Into<String>) -> Self {
        self.border = Some(border.into());
        self
    }

    pub fn show_for_ms(mut self, millis: i64) -> Self {
        self.show_for = Some(millis);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.background.is_none() && self.border.is_none() && self.show_for.is_none()
    }

    /// Parse overrides from a JSON document such as `{"background": "green", "showFor": 5000}`
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            BrowserError::InvalidPreference(format!("Failed to parse preferences: {}", e))
        })
    }

    /// Load overrides from a JSON file
    pub async fn from_file(path: &Path) -> Result<Self> {
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            BrowserError::Other(format!(
                "Failed to read preferences file {}: {}",
                path.display(),
                e
            ))
        })?;
        Self::from_json_str(&content)
    }

    /// Layer `self` on top of `lower`: fields set here win, unset ones fall through
    pub fn over(&self, lower: &PreferenceOverrides) -> PreferenceOverrides {
        PreferenceOverrides {
            background: self.background.clone().or_else(|| lower.background.clone()),
            border: self.border.clone().or_else(|| lower.border.clone()),
            show_for: self.show_for.or(lower.show_for),
        }
    }
}

/// Merge call-level over instance-level over the defaults and validate the result
pub fn resolve(
    local: Option<&PreferenceOverrides>,
    instance: &PreferenceOverrides,
) -> Result<StylePreferences> {
    let merged = match local {
        Some(local) => local.over(instance),
        None => instance.clone(),
    };

    let defaults = StylePreferences::default();

    let background = merged.background.unwrap_or(defaults.background);
    validate_css_value("background", &background)?;

    let border = merged.border.unwrap_or(defaults.border);
    validate_css_value("border", &border)?;

    let show_for = match merged.show_for {
        Some(millis) if millis < 0 => {
            return Err(BrowserError::InvalidPreference(format!(
                "showFor must be a non-negative number of milliseconds, got {}",
                millis
            )));
        }
        Some(millis) if millis > MAX_SHOW_FOR_MS => {
            return Err(BrowserError::InvalidPreference(format!(
                "showFor must be at most {} milliseconds, got {}",
                MAX_SHOW_FOR_MS, millis
            )));
        }
        Some(millis) => Duration::from_millis(millis as u64),
        None => defaults.show_for,
    };

    Ok(StylePreferences {
        background,
        border,
        show_for,
    })
}

/// A value must fit inside a single inline declaration
fn validate_css_value(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(BrowserError::InvalidPreference(format!(
            "{} cannot be empty",
            field
        )));
    }

    if let Some(c) = value.chars().find(|c| matches!(c, '\n' | '\r')) {
        return Err(BrowserError::InvalidPreference(format!(
            "{} value '{}' contains forbidden character {:?}",
            field, value, c
        )));
    }

    declaration_scan(value).map_err(|reason| {
        BrowserError::InvalidPreference(format!("{} value '{}' {}", field, value, reason))
    })
}

/// `;`, `{` and `}` are fine inside `url(...)` or a string, but anywhere
/// else they end the declaration. Unclosed parentheses or quotes would
/// swallow the declarations appended after the value.
fn declaration_scan(value: &str) -> std::result::Result<(), String> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;

    for c in value.chars() {
        if escaped {
            escaped = false;
            continue;
        }

        match (quote, c) {
            (_, '\\') => escaped = true,
            (Some(q), c) if c == q => quote = None,
            (Some(_), _) => {}
            (None, '"' | '\'') => quote = Some(c),
            (None, '(') => depth += 1,
            (None, ')') if depth == 0 => return Err("has an unmatched ')'".to_string()),
            (None, ')') => depth -= 1,
            (None, ';' | '{' | '}') if depth == 0 => {
                return Err(format!("contains forbidden character {:?}", c))
            }
            _ => {}
        }
    }

    if quote.is_some() {
        return Err("has an unclosed string".to_string());
    }
    if depth > 0 {
        return Err("has an unclosed '('".to_string());
    }

    Ok(())
}
