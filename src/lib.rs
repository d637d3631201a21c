pub mod browser;
pub mod driver;
pub mod error;
pub mod marker;
pub mod selector;

//  Re-export commonly used items
pub use browser::chrome::{ChromeDriver, ChromeElement, ConnectionMode};
pub use driver::{Driver, PageScript};
pub use error::{BrowserError, Result};
pub use marker::ledger::{OriginalStyle, StyleLedger, StyleRecord};
pub use marker::preferences::{PreferenceOverrides, StylePreferences};
pub use marker::Marker;
pub use selector::{By, Locator, Selector};
