//! Driver capability contract
//!
//! The marker never talks to a browser directly. It needs two things from
//! whatever automation backend is in use: find an element, and run a script
//! against that element inside the page.

use crate::error::Result;
use crate::selector::Selector;
use async_trait::async_trait;
use serde_json::Value;
use std::fmt;

/// A JavaScript function declaration run inside the page
///
/// The located element is passed as the first parameter, followed by the
/// JSON arguments given to [`Driver::run_in_page`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageScript {
    pub name: &'static str,
    pub source: &'static str,
}

impl fmt::Display for PageScript {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

#[async_trait]
pub trait Driver: Send + Sync {
    /// Handle to a located element, valid for the lifetime of the page
    type Element: Clone + Send + Sync;

    /// Locate the first element matching `selector`
    ///
    /// Fails with [`BrowserError::ElementNotFound`](crate::BrowserError::ElementNotFound)
    /// when nothing matches.
    async fn locate(&self, selector: &Selector) -> Result<Self::Element>;

    /// Run `script` in the page with `element` as its first argument
    async fn run_in_page(
        &self,
        script: &PageScript,
        element: &Self::Element,
        args: Vec<Value>,
    ) -> Result<Value>;
}
