//! In-page scripts
//!
//! `null` from `getAttribute('style')` means the element had no style
//! attribute at all. Restoring `null` removes the attribute again so the
//! element ends up exactly as it was.

use crate::driver::PageScript;

/// `(element, background, border) -> originalStyle | null`
pub const APPLY_HIGHLIGHT: PageScript = PageScript {
    name: "apply-highlight",
    source: r#"function(element, background, border) {
    var originalStyle = element.getAttribute('style');
    var base = originalStyle === null ? '' : originalStyle;
    element.setAttribute('style', base + '; background: ' + background + '; border: ' + border + ';');
    return originalStyle;
}"#,
};

/// `(element, background, border, showForMs) -> originalStyle | null`
///
/// The restore timer lives in the page; nothing on our side can cancel it.
pub const APPLY_TIMED_HIGHLIGHT: PageScript = PageScript {
    name: "apply-timed-highlight",
    source: r#"function(element, background, border, showForMs) {
    var originalStyle = element.getAttribute('style');
    var base = originalStyle === null ? '' : originalStyle;
    element.setAttribute('style', base + '; background: ' + background + '; border: ' + border + ';');
    setTimeout(function() {
        if (originalStyle === null) {
            element.removeAttribute('style');
        } else {
            element.setAttribute('style', originalStyle);
        }
    }, showForMs);
    return originalStyle;
}"#,
};

/// `(element, style | null) -> null`, applied on the page's next tick
pub const RESTORE_STYLE: PageScript = PageScript {
    name: "restore-style",
    source: r#"function(element, style) {
    setTimeout(function() {
        if (style === null || style === undefined) {
            element.removeAttribute('style');
        } else {
            element.setAttribute('style', style);
        }
    }, 0);
    return null;
}"#,
};
