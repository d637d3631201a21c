//! Marker behaviour against the in-memory page
//!
//! Covers preference precedence, the style ledger, highlight/remove round
//! trips, batch fail-fast and the page-side timer for timed highlights.


use fake_page::{FakeHandle, FakePage};
use std::time::Duration;
use webdriver_marker::{
    BrowserError, By, Locator, Marker, OriginalStyle, PreferenceOverrides, Selector,
};

fn page() -> FakePage {
    FakePage::new()
        .with_element(Locator::Id("x".to_string()), None)
        .with_element(Locator::Id("y".to_string()), Some("color:red"))
        .with_element(Locator::Id("z".to_string()), Some("width: 10px"))
        .with_element(Locator::Id("empty".to_string()), Some(""))
        .with_element(Locator::Name("q".to_string()), None)
}

#[tokio::test]
async fn test_highlight_element_without_prior_style() {
    let page = page();
    let mut marker = Marker::new(&page);

    let handle = marker.highlight_element(&By::id("x"), None).await.unwrap();
    assert_eq!(handle, FakeHandle(0));

    assert_eq!(
        page.style_of(&By::id("x")).as_deref(),
        Some("; background: yellow; border: 2px solid red;")
    );

    let record = marker.ledger().get(&By::id("x")).expect("record stored");
    assert_eq!(record.selector, By::id("x"));
    assert_eq!(record.original_style, OriginalStyle::Absent);
    assert!(record.highlighted);
    assert_eq!(page.pending_timers(), 0, "no timer for a plain highlight");
}

#[tokio::test]
async fn test_preference_precedence_in_applied_style() {
    let page = page();
    let mut marker = Marker::with_preferences(
        &page,
        PreferenceOverrides::new().background("green").show_for_ms(5000),
    );

    marker
        .highlight_element(
            &By::id("y"),
            Some(&PreferenceOverrides::new().border("5px solid black")),
        )
        .await
        .unwrap();
    assert_eq!(
        page.style_of(&By::id("y")).as_deref(),
        Some("color:red; background: green; border: 5px solid black;")
    );

    marker
        .highlight_element(
            &By::id("z"),
            Some(&PreferenceOverrides::new().background("blue")),
        )
        .await
        .unwrap();
    assert_eq!(
        page.style_of(&By::id("z")).as_deref(),
        Some("width: 10px; background: blue; border: 2px solid red;")
    );
}

#[tokio::test]
async fn test_round_trip_restores_exact_style() {
    let page = page();
    let mut marker = Marker::new(&page);

    for (id, before) in [("x", None), ("y", Some("color:red")), ("empty", Some(""))] {
        let sel = By::id(id);
        marker.highlight_element(&sel, None).await.unwrap();
        assert_ne!(page.style_of(&sel).as_deref(), before);

        marker.remove_highlight(&sel).await.unwrap();
        page.advance(Duration::ZERO);

        assert_eq!(page.style_of(&sel).as_deref(), before, "element #{}", id);
    }
}

#[tokio::test]
async fn test_remove_applies_on_next_tick() {
    let page = page();
    let mut marker = Marker::new(&page);
    let sel = By::id("y");

    marker.highlight_element(&sel, None).await.unwrap();
    marker.remove_highlight(&sel).await.unwrap();

    assert_eq!(
        page.style_of(&sel).as_deref(),
        Some("color:red; background: yellow; border: 2px solid red;")
    );
    assert_eq!(page.pending_timers(), 1);

    page.advance(Duration::ZERO);
    assert_eq!(page.style_of(&sel).as_deref(), Some("color:red"));
}

#[tokio::test]
async fn test_double_remove_is_idempotent() {
    let page = page();
    let mut marker = Marker::new(&page);
    let sel = By::id("y");

    marker.highlight_element(&sel, None).await.unwrap();

    marker.remove_highlight(&sel).await.unwrap();
    page.advance(Duration::ZERO);
    let after_first = page.style_of(&sel);

    marker.remove_highlight(&sel).await.unwrap();
    page.advance(Duration::ZERO);

    assert_eq!(page.style_of(&sel), after_first);
    assert_eq!(after_first.as_deref(), Some("color:red"));
    assert_eq!(marker.ledger().len(), 1);
}

#[tokio::test]
async fn test_repeated_highlight_keeps_first_original() {
    let page = page();
    let mut marker = Marker::new(&page);
    let sel = By::id("y");

    for background in ["pink", "orange", "lime"] {
        marker
            .highlight_element(&sel, Some(&PreferenceOverrides::new().background(background)))
            .await
            .unwrap();
    }

    assert_eq!(marker.ledger().len(), 1);
    assert_eq!(
        marker.ledger().get(&sel).unwrap().original_style,
        OriginalStyle::Inline("color:red".to_string())
    );

    marker.remove_highlight(&sel).await.unwrap();
    page.advance(Duration::ZERO);
    assert_eq!(page.style_of(&sel).as_deref(), Some("color:red"));
}

#[tokio::test]
async fn test_shorthand_and_native_share_a_record() {
    let page = page();
    let mut marker = Marker::new(&page);

    marker
        .highlight_element(&Selector::shorthand("name", "q"), None)
        .await
        .unwrap();
    marker.remove_highlight(&By::name("q")).await.unwrap();
    page.advance(Duration::ZERO);

    assert_eq!(page.style_of(&By::name("q")), None);
    assert_eq!(marker.ledger().len(), 1);
}

#[tokio::test]
async fn test_remove_without_record_sets_empty_style() {
    let page = page();
    let mut marker = Marker::new(&page);
    let sel = By::id("z");

    marker.remove_highlight(&sel).await.unwrap();
    page.advance(Duration::ZERO);

    assert_eq!(page.style_of(&sel).as_deref(), Some(""));
    let record = marker.ledger().get(&sel).expect("record stored");
    assert_eq!(record.original_style, OriginalStyle::Inline(String::new()));
    assert!(!record.highlighted);

    // The stored record restores "" again rather than dropping the attribute
    marker.remove_highlight(&sel).await.unwrap();
    page.advance(Duration::ZERO);
    assert_eq!(page.style_of(&sel).as_deref(), Some(""));
}

#[tokio::test]
async fn test_highlight_elements_fails_fast() {
    let page = page();
    let mut marker = Marker::new(&page);
    let selectors = vec![By::id("x"), By::id("missing"), By::id("y")];

    let err = marker
        .highlight_elements(&selectors, None)
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::ElementNotFound(_)));

    assert_eq!(page.located(), vec![By::id("x"), By::id("missing")]);
    assert!(page.style_of(&By::id("x")).is_some());
    assert_eq!(page.style_of(&By::id("y")).as_deref(), Some("color:red"));
    assert!(marker.ledger().get(&By::id("y")).is_none());
}

#[tokio::test]
async fn test_highlight_and_remove_batches() {
    let page = page();
    let mut marker = Marker::new(&page);
    let selectors = vec![By::id("x"), By::id("y"), Selector::shorthand("id", "z")];

    marker
        .highlight_elements(&selectors, Some(&PreferenceOverrides::new().border("1px solid blue")))
        .await
        .unwrap();
    assert_eq!(
        page.style_of(&By::id("z")).as_deref(),
        Some("width: 10px; background: yellow; border: 1px solid blue;")
    );

    marker.remove_highlights(&selectors).await.unwrap();
    page.advance(Duration::ZERO);

    assert_eq!(page.style_of(&By::id("x")), None);
    assert_eq!(page.style_of(&By::id("y")).as_deref(), Some("color:red"));
    assert_eq!(page.style_of(&By::id("z")).as_deref(), Some("width: 10px"));
}

#[tokio::test]
async fn test_remove_highlights_fails_fast() {
    let page = page();
    let mut marker = Marker::new(&page);

    let err = marker
        .remove_highlights(&[By::id("missing"), By::id("x")])
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::ElementNotFound(_)));
    assert_eq!(page.located(), vec![By::id("missing")]);
    assert!(marker.ledger().is_empty());
}

#[tokio::test]
async fn test_timed_highlight_reverts_on_page_timer() {
    let page = page();
    let mut marker = Marker::new(&page);
    let sel = By::id("y");

    marker
        .highlight_element_for(&sel, Some(&PreferenceOverrides::new().show_for_ms(100)))
        .await
        .unwrap();

    assert_eq!(
        page.style_of(&sel).as_deref(),
        Some("color:red; background: yellow; border: 2px solid red;")
    );
    assert!(marker.ledger().is_empty(), "timed highlights are not recorded");

    page.advance(Duration::from_millis(99));
    assert_ne!(page.style_of(&sel).as_deref(), Some("color:red"));

    page.advance(Duration::from_millis(1));
    assert_eq!(page.style_of(&sel).as_deref(), Some("color:red"));
}

#[tokio::test]
async fn test_timed_highlight_uses_instance_show_for() {
    let page = page();
    let mut marker =
        Marker::with_preferences(&page, PreferenceOverrides::new().show_for_ms(2000));
    let sel = By::id("x");

    marker.highlight_element_for(&sel, None).await.unwrap();

    page.advance(Duration::from_millis(300));
    assert!(page.style_of(&sel).is_some());

    page.advance(Duration::from_millis(1700));
    assert_eq!(page.style_of(&sel), None);
}

#[tokio::test]
async fn test_pending_timer_clobbers_newer_highlight() {
    let page = page();
    let mut marker = Marker::new(&page);
    let sel = By::id("y");

    marker
        .highlight_element_for(&sel, Some(&PreferenceOverrides::new().show_for_ms(100)))
        .await
        .unwrap();
    page.advance(Duration::from_millis(50));

    marker
        .highlight_element(&sel, Some(&PreferenceOverrides::new().background("green")))
        .await
        .unwrap();

    page.advance(Duration::from_millis(50));
    assert_eq!(page.style_of(&sel).as_deref(), Some("color:red"));
}

#[tokio::test]
async fn test_invalid_preference_stops_before_locate() {
    let page = page();
    let mut marker = Marker::new(&page);

    let err = marker
        .highlight_element_for(&By::id("x"), Some(&PreferenceOverrides::new().show_for_ms(-5)))
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::InvalidPreference(_)));
    assert!(page.located().is_empty());
    assert_eq!(page.style_of(&By::id("x")), None);
}

#[tokio::test]
async fn test_unknown_shorthand_field_is_reported() {
    let page = page();
    let mut marker = Marker::new(&page);

    let err = marker
        .highlight_element(&Selector::shorthand("label", "Search"), None)
        .await
        .unwrap_err();
    assert!(matches!(err, BrowserError::InvalidSelector(_)));
}
