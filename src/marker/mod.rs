//! Highlight Marker
//!
//! Highlights elements by appending `background` and `border` declarations to
//! their inline style, and puts the previous inline style back on request.
//!
//! # Example
//!
//! ```no_run
//! use webdriver_marker::{By, ChromeDriver, ConnectionMode, Marker, PreferenceOverrides, Selector};
//!
//! # async fn example() -> anyhow::Result<()> {
//! let driver = ChromeDriver::new(ConnectionMode::Sandboxed {
//!     chrome_path: None,
//!     no_sandbox: true,
//!     headless: true,
//! })
//! .await?;
//! driver.navigate("https://example.com").await?;
//!
//! let mut marker = Marker::with_preferences(
//!     &driver,
//!     PreferenceOverrides::new().background("green").show_for_ms(5000),
//! );
//! marker
//!     .highlight_elements(
//!         &[By::tag_name("h1"), Selector::shorthand("css", "p")],
//!         Some(&PreferenceOverrides::new().border("5px solid black")),
//!     )
//!     .await?;
//! marker.remove_highlight(&By::tag_name("h1")).await?;
//! marker.highlight_element_for(&By::css("a"), None).await?;
//! # Ok(())
//! # }
//! ```

pub mod ledger;
pub mod preferences;
pub mod scripts;

use crate::driver::{Driver, PageScript};
use crate::error::{BrowserError, Result};
use crate::selector::Selector;
use ledger::{OriginalStyle, StyleLedger};
use preferences::{PreferenceOverrides, StylePreferences};
use serde_json::{json, Value};

pub struct Marker<'d, D: Driver> {
    driver: &'d D,
    preferences: PreferenceOverrides,
    ledger: StyleLedger,
}

impl<'d, D: Driver> Marker<'d, D> {
    /// Create a marker that uses the built-in defaults
    pub fn new(driver: &'d D) -> Self {
        Self::with_preferences(driver, PreferenceOverrides::default())
    }

    /// Create a marker whose preferences override the defaults on every call
    pub fn with_preferences(driver: &'d D, preferences: PreferenceOverrides) -> Self {
        Self {
            driver,
            preferences,
            ledger: StyleLedger::new(),
        }
    }

    pub fn instance_preferences(&self) -> &PreferenceOverrides {
        &self.preferences
    }

    pub fn ledger(&self) -> &StyleLedger {
        &self.ledger
    }

    /// Effective preferences for a call with the given local overrides
    pub fn resolve_preferences(
        &self,
        local: Option<&PreferenceOverrides>,
    ) -> Result<StylePreferences> {
        preferences::resolve(local, &self.preferences)
    }

    /// Highlight an element until [`remove_highlight`](Self::remove_highlight) is called
    pub async fn highlight_element(
        &mut self,
        selector: &Selector,
        local: Option<&PreferenceOverrides>,
    ) -> Result<D::Element> {
        let prefs = self.resolve_preferences(local)?;
        let element = self.driver.locate(selector).await?;

        log::info!("Highlighting {} ({})", selector, prefs.declarations());

        let result = self
            .driver
            .run_in_page(
                &scripts::APPLY_HIGHLIGHT,
                &element,
                vec![json!(prefs.background), json!(prefs.border)],
            )
            .await?;
        let original = parse_original_style(&scripts::APPLY_HIGHLIGHT, result)?;

        self.ledger.record_highlight(selector, original);

        Ok(element)
    }

    /// Highlight an element and let the page remove it after `show_for`
    ///
    /// Returns as soon as the highlight is applied. The restore runs on the
    /// page's own timer: it does not touch the ledger, cannot be cancelled,
    /// and will overwrite whatever style the element has when it fires.
    pub async fn highlight_element_for(
        &mut self,
        selector: &Selector,
        local: Option<&PreferenceOverrides>,
    ) -> Result<D::Element> {
        let prefs = self.resolve_preferences(local)?;
        let element = self.driver.locate(selector).await?;

        log::info!(
            "Highlighting {} for {}ms ({})",
            selector,
            prefs.show_for_ms(),
            prefs.declarations()
        );

        let result = self
            .driver
            .run_in_page(
                &scripts::APPLY_TIMED_HIGHLIGHT,
                &element,
                vec![
                    json!(prefs.background),
                    json!(prefs.border),
                    json!(prefs.show_for_ms()),
                ],
            )
            .await?;
        parse_original_style(&scripts::APPLY_TIMED_HIGHLIGHT, result)?;

        Ok(element)
    }

    /// Highlight each selector in order with the same local overrides
    ///
    /// Stops at the first failure: earlier elements stay highlighted and the
    /// remaining selectors are not touched.
    pub async fn highlight_elements(
        &mut self,
        selectors: &[Selector],
        local: Option<&PreferenceOverrides>,
    ) -> Result<()> {
        for selector in selectors {
            self.highlight_element(selector, local).await?;
        }
        Ok(())
    }

    /// Put back the inline style recorded before the element was highlighted
    ///
    /// Without a record the style is set to an empty string. The page applies
    /// the change on its next tick.
    pub async fn remove_highlight(&mut self, selector: &Selector) -> Result<D::Element> {
        let element = self.driver.locate(selector).await?;

        let restored = match self.ledger.get(selector) {
            Some(record) => record.original_style.clone(),
            None => {
                log::debug!("No style record for {}, restoring empty style", selector);
                OriginalStyle::Inline(String::new())
            }
        };

        log::info!("Removing highlight from {}", selector);

        self.driver
            .run_in_page(
                &scripts::RESTORE_STYLE,
                &element,
                vec![json!(restored.as_attribute())],
            )
            .await?;

        self.ledger.record_restored(selector, restored);

        Ok(element)
    }

    /// Remove highlights in order, stopping at the first failure
    pub async fn remove_highlights(&mut self, selectors: &[Selector]) -> Result<()> {
        for selector in selectors {
            self.remove_highlight(selector).await?;
        }
        Ok(())
    }
}

fn parse_original_style(script: &PageScript, value: Value) -> Result<OriginalStyle> {
    let attribute = match value {
        Value::Null => None,
        Value::String(style) => Some(style),
        other => {
            return Err(BrowserError::ScriptFailed {
                script: script.name.to_string(),
                message: format!("expected a style string or null, got {}", other),
            })
        }
    };
    Ok(OriginalStyle::from_attribute(attribute))
}
