//! Element Selectors
//!
//! A [`Selector`] is either a driver-native [`Locator`] or a `field = value`
//! shorthand such as `{name: "q"}`. Drivers resolve shorthands with
//! [`Selector::resolve`]; the marker only uses [`Selector::canonical`] to key
//! its style ledger.

use crate::error::{BrowserError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Element location strategy
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Locator {
    ClassName(String),
    Css(String),
    Id(String),
    /// Function body evaluated in the page that returns the element
    Js(String),
    LinkText(String),
    Name(String),
    PartialLinkText(String),
    TagName(String),
    #[serde(rename = "xpath")]
    XPath(String),
}

/// Selector as accepted by the marker API
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Selector {
    Native(Locator),
    Shorthand { field: String, value: String },
}

/// Constructors named after the usual `By` strategies
pub struct By;

impl By {
    pub fn class_name(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::ClassName(value.into()))
    }

    pub fn css(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::Css(value.into()))
    }

    pub fn id(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::Id(value.into()))
    }

    pub fn js(body: impl Into<String>) -> Selector {
        Selector::Native(Locator::Js(body.into()))
    }

    pub fn link_text(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::LinkText(value.into()))
    }

    pub fn name(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::Name(value.into()))
    }

    pub fn partial_link_text(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::PartialLinkText(value.into()))
    }

    pub fn tag_name(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::TagName(value.into()))
    }

    pub fn xpath(value: impl Into<String>) -> Selector {
        Selector::Native(Locator::XPath(value.into()))
    }
}

impl Locator {
    /// Build a locator from a shorthand field name
    pub fn from_field(field: &str, value: &str) -> Result<Self> {
        if value.is_empty() {
            return Err(BrowserError::InvalidSelector(format!(
                "Empty value for '{}'",
                field
            )));
        }

        let value = value.to_string();
        let locator = match field {
            "className" | "class name" => Locator::ClassName(value),
            "css" => Locator::Css(value),
            "id" => Locator::Id(value),
            "js" => Locator::Js(value),
            "linkText" | "link text" => Locator::LinkText(value),
            "name" => Locator::Name(value),
            "partialLinkText" | "partial link text" => Locator::PartialLinkText(value),
            "tagName" | "tag name" => Locator::TagName(value),
            "xpath" => Locator::XPath(value),
            other => {
                return Err(BrowserError::InvalidSelector(format!(
                    "Unknown locator strategy '{}'",
                    other
                )))
            }
        };

        Ok(locator)
    }

    pub fn strategy(&self) -> &'static str {
        match self {
            Locator::ClassName(_) => "class name",
            Locator::Css(_) => "css",
            Locator::Id(_) => "id",
            Locator::Js(_) => "js",
            Locator::LinkText(_) => "link text",
            Locator::Name(_) => "name",
            Locator::PartialLinkText(_) => "partial link text",
            Locator::TagName(_) => "tag name",
            Locator::XPath(_) => "xpath",
        }
    }

    pub fn value(&self) -> &str {
        match self {
            Locator::ClassName(v)
            | Locator::Css(v)
            | Locator::Id(v)
            | Locator::Js(v)
            | Locator::LinkText(v)
            | Locator::Name(v)
            | Locator::PartialLinkText(v)
            | Locator::TagName(v)
            | Locator::XPath(v) => v,
        }
    }
}

impl Selector {
    pub fn shorthand(field: impl Into<String>, value: impl Into<String>) -> Self {
        Selector::Shorthand {
            field: field.into(),
            value: value.into(),
        }
    }

    /// Resolve to a concrete locator
    pub fn resolve(&self) -> Result<Locator> {
        match self {
            Selector::Native(locator) => Ok(locator.clone()),
            Selector::Shorthand { field, value } => Locator::from_field(field, value),
        }
    }

    /// The value used to compare selectors: shorthands with a known field
    /// become the equivalent native locator, anything else stays as written.
    pub fn canonical(&self) -> Selector {
        match self {
            Selector::Native(_) => self.clone(),
            Selector::Shorthand { field, value } => match Locator::from_field(field, value) {
                Ok(locator) => Selector::Native(locator),
                Err(_) => self.clone(),
            },
        }
    }
}

impl From<Locator> for Selector {
    fn from(locator: Locator) -> Self {
        Selector::Native(locator)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "By({}: {})", self.strategy(), self.value())
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Selector::Native(locator) => write!(f, "{}", locator),
            Selector::Shorthand { field, value } => write!(f, "{{{}: {:?}}}", field, value),
        }
    }
}

/// Parse `strategy=value` as used on the command line, e.g. `css=#main` or `name=q`
impl std::str::FromStr for Selector {
    type Err = BrowserError;

    fn from_str(s: &str) -> Result<Self> {
        let (field, value) = s.split_once('=').ok_or_else(|| {
            BrowserError::InvalidSelector(format!("Expected strategy=value, got '{}'", s))
        })?;
        Locator::from_field(field.trim(), value).map(Selector::Native)
    }
}
