use super::*;
use async_trait::async_trait;
use pagelocale_dom::Page;
use pagelocale_store::MemoryPreferenceStore;
use std::sync::atomic::{AtomicUsize, Ordering};

const TABLE: &str = r#"{"en":{"title":"Hello"},"fr":{"title":"Bonjour"}}"#;

/// Serves a fixed JSON table and counts fetches.
struct StaticSource {
    json: String,
    fetches: AtomicUsize,
}

impl StaticSource {
    fn new(json: &str) -> Arc<Self> {
        Arc::new(Self {
            json: json.to_string(),
            fetches: AtomicUsize::new(0),
        })
    }
}

#[async_trait]
impl TableSource for StaticSource {
    fn name(&self) -> &str {
        "static"
    }

    fn location(&self) -> &str {
        "memory://lang.json"
    }

    async fn fetch(&self) -> Result<TranslationTable, LocaleError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        TranslationTable::from_json(&self.json)
    }
}

/// A source whose network is always down.
struct DownSource;

#[async_trait]
impl TableSource for DownSource {
    fn name(&self) -> &str {
        "down"
    }

    fn location(&self) -> &str {
        "http://unreachable/assets/lang/lang.json"
    }

    async fn fetch(&self) -> Result<TranslationTable, LocaleError> {
        Err(LocaleError::Fetch("connection refused".to_string()))
    }
}

fn localizer(
    store: Arc<MemoryPreferenceStore>,
    source: Arc<dyn TableSource>,
    config: LocaleConfig,
) -> Localizer {
    Localizer::new(store, source, config)
}

#[tokio::test]
async fn test_apply_sets_translation() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store, StaticSource::new(TABLE), LocaleConfig::default());
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    let report = loc.apply_language(&mut page, "fr").await.unwrap();
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Bonjour</h1>"#);
    assert_eq!(report.requested, "fr");
    assert_eq!(report.applied.as_deref(), Some("fr"));
    assert_eq!(report.translated, 1);
    assert!(report.untouched.is_empty());
}

#[tokio::test]
async fn test_apply_persists_language() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store.clone(), StaticSource::new(TABLE), LocaleConfig::default());
    let mut page = Page::parse("<p>nothing marked</p>");

    loc.apply_language(&mut page, "fr").await.unwrap();
    assert_eq!(store.get("lang").await.unwrap().as_deref(), Some("fr"));
    assert_eq!(page.to_html(), "<p>nothing marked</p>");
}

#[tokio::test]
async fn test_reload_uses_stored_language() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store.clone(), StaticSource::new(TABLE), LocaleConfig::default());

    let mut first = Page::parse(r#"<h1 data-t="title">Default</h1>"#);
    loc.apply_language(&mut first, "fr").await.unwrap();

    // A fresh page load with the same store.
    let mut reloaded = Page::parse(r#"<h1 data-t="title">Default</h1>"#);
    let report = loc.on_load(&mut reloaded).await.unwrap();
    assert_eq!(report.requested, "fr");
    assert_eq!(reloaded.to_html(), r#"<h1 data-t="title">Bonjour</h1>"#);
}

#[tokio::test]
async fn test_on_load_defaults_to_en() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store.clone(), StaticSource::new(TABLE), LocaleConfig::default());
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    let report = loc.on_load(&mut page).await.unwrap();
    assert_eq!(report.requested, "en");
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Hello</h1>"#);
    assert_eq!(store.get("lang").await.unwrap().as_deref(), Some("en"));
}

#[tokio::test]
async fn test_on_load_uses_configured_default_and_key() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let config = LocaleConfig {
        default_language: "fr".to_string(),
        storage_key: "site.lang".to_string(),
        ..Default::default()
    };
    let loc = localizer(store.clone(), StaticSource::new(TABLE), config);
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    loc.on_load(&mut page).await.unwrap();
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Bonjour</h1>"#);
    assert_eq!(store.get("site.lang").await.unwrap().as_deref(), Some("fr"));
    assert_eq!(store.get("lang").await.unwrap(), None);
}

#[tokio::test]
async fn test_missing_language_fails_before_mutation() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store.clone(), StaticSource::new(TABLE), LocaleConfig::default());
    let src = r#"<h1 data-t="title">Default</h1><p data-t="title">Also default</p>"#;
    let mut page = Page::parse(src);

    let err = loc.apply_language(&mut page, "de").await.unwrap_err();
    assert!(matches!(err, LocaleError::MissingLanguage(ref l) if l == "de"));
    assert_eq!(page.to_html(), src);
    // The preference is still written.
    assert_eq!(store.get("lang").await.unwrap().as_deref(), Some("de"));
}

#[tokio::test]
async fn test_missing_language_fallback() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let config = LocaleConfig {
        missing_language: MissingLanguage::Fallback,
        ..Default::default()
    };
    let loc = localizer(store.clone(), StaticSource::new(TABLE), config);
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    let report = loc.apply_language(&mut page, "de").await.unwrap();
    assert_eq!(report.requested, "de");
    assert_eq!(report.applied.as_deref(), Some("en"));
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Hello</h1>"#);
    assert_eq!(store.get("lang").await.unwrap().as_deref(), Some("de"));
}

#[tokio::test]
async fn test_fallback_without_default_entry_fails() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let config = LocaleConfig {
        missing_language: MissingLanguage::Fallback,
        ..Default::default()
    };
    let loc = localizer(store, StaticSource::new(r#"{"fr":{"title":"Bonjour"}}"#), config);
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    let err = loc.apply_language(&mut page, "de").await.unwrap_err();
    assert!(matches!(err, LocaleError::MissingLanguage(_)));
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Default</h1>"#);
}

#[tokio::test]
async fn test_missing_language_skip() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let config = LocaleConfig {
        missing_language: MissingLanguage::Skip,
        ..Default::default()
    };
    let loc = localizer(store, StaticSource::new(TABLE), config);
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    let report = loc.apply_language(&mut page, "de").await.unwrap();
    assert_eq!(report.applied, None);
    assert_eq!(report.translated, 0);
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Default</h1>"#);
}

#[tokio::test]
async fn test_preserve_keeps_blank_and_absent() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"title":"","subtitle":"   ","body":"Text"}}"#);
    let loc = localizer(store, source, LocaleConfig::default());
    let mut page = Page::parse(
        r#"<h1 data-t="title">Default</h1><h2 data-t="subtitle">Sub</h2><p data-t="body">B</p><p data-t="footer">F</p>"#,
    );

    let report = loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(
        page.to_html(),
        r#"<h1 data-t="title">Default</h1><h2 data-t="subtitle">Sub</h2><p data-t="body">Text</p><p data-t="footer">F</p>"#
    );
    assert_eq!(report.translated, 1);
    assert_eq!(report.untouched, vec!["title", "subtitle", "footer"]);
    assert!(report.cleared.is_empty());
}

#[tokio::test]
async fn test_overwrite_writes_exact_values() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"title":"","subtitle":"  ","body":"Text"}}"#);
    let config = LocaleConfig {
        missing_policy: MissingPolicy::Overwrite,
        ..Default::default()
    };
    let loc = localizer(store, source, config);
    let mut page = Page::parse(
        r#"<h1 data-t="title">Default</h1><h2 data-t="subtitle">Sub</h2><p data-t="body">B</p><p data-t="footer">F</p>"#,
    );

    let report = loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(
        page.to_html(),
        r#"<h1 data-t="title"></h1><h2 data-t="subtitle">  </h2><p data-t="body">Text</p><p data-t="footer"></p>"#
    );
    assert_eq!(report.translated, 1);
    assert_eq!(report.cleared, vec!["title", "subtitle", "footer"]);
    assert!(report.untouched.is_empty());
}

#[tokio::test]
async fn test_text_mode_escapes_markup() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"intro":"Welcome <b>back</b>"}}"#);
    let loc = localizer(store, source, LocaleConfig::default());
    let mut page = Page::parse(r#"<p data-t="intro">Hi</p>"#);

    loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(
        page.to_html(),
        r#"<p data-t="intro">Welcome &lt;b&gt;back&lt;/b&gt;</p>"#
    );
}

#[tokio::test]
async fn test_markup_mode_renders_tags() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"intro":"Welcome <b>back</b>"}}"#);
    let config = LocaleConfig {
        content_mode: ContentMode::Markup,
        ..Default::default()
    };
    let loc = localizer(store, source, config);
    let mut page = Page::parse(r#"<p data-t="intro">Hi</p>"#);

    loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(page.to_html(), r#"<p data-t="intro">Welcome <b>back</b></p>"#);
}

#[tokio::test]
async fn test_custom_marker_attribute() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let config = LocaleConfig {
        marker_attribute: "data-i18n".to_string(),
        ..Default::default()
    };
    let loc = localizer(store, StaticSource::new(TABLE), config);
    let mut page = Page::parse(r#"<h1 data-i18n="title">A</h1><h2 data-t="title">B</h2>"#);

    loc.apply_language(&mut page, "fr").await.unwrap();
    assert_eq!(
        page.to_html(),
        r#"<h1 data-i18n="title">Bonjour</h1><h2 data-t="title">B</h2>"#
    );
}

#[tokio::test]
async fn test_fetch_failure_still_persists_language() {
    let store = Arc::new(MemoryPreferenceStore::with_value("lang", "en"));
    let loc = localizer(store.clone(), Arc::new(DownSource), LocaleConfig::default());
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    let err = loc.apply_language(&mut page, "fr").await.unwrap_err();
    assert!(matches!(err, LocaleError::Fetch(_)));
    assert_eq!(store.get("lang").await.unwrap().as_deref(), Some("fr"));
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Default</h1>"#);
}

#[tokio::test]
async fn test_table_fetched_on_every_pass() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(TABLE);
    let loc = localizer(store, source.clone(), LocaleConfig::default());
    let mut page = Page::parse(r#"<h1 data-t="title">Default</h1>"#);

    loc.apply_language(&mut page, "fr").await.unwrap();
    loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    assert_eq!(page.to_html(), r#"<h1 data-t="title">Hello</h1>"#);
}

#[tokio::test]
async fn test_same_key_on_many_elements() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store, StaticSource::new(TABLE), LocaleConfig::default());
    let mut page = Page::parse(
        r#"<title data-t="title">T</title><body><h1 data-t="title">H</h1></body>"#,
    );

    let report = loc.apply_language(&mut page, "fr").await.unwrap();
    assert_eq!(report.translated, 2);
    assert_eq!(
        page.to_html(),
        r#"<title data-t="title">Bonjour</title><body><h1 data-t="title">Bonjour</h1></body>"#
    );
}

#[tokio::test]
async fn test_siblings_without_end_tags_are_both_translated() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"a":"Apple","b":"Banana"}}"#);
    let loc = localizer(store, source, LocaleConfig::default());

    let mut page = Page::parse(r#"<ul><li data-t="a">A<li data-t="b">B</ul>"#);
    let report = loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(
        page.to_html(),
        r#"<ul><li data-t="a">Apple<li data-t="b">Banana</ul>"#
    );
    assert_eq!(report.translated, 2);

    let mut page = Page::parse(r#"<p data-t="a">A<p data-t="b">B"#);
    let report = loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(page.to_html(), r#"<p data-t="a">Apple<p data-t="b">Banana"#);
    assert_eq!(report.translated, 2);
}

#[tokio::test]
async fn test_nested_marked_element_not_counted_after_removal() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"outer":"Outer","inner":"Inner"}}"#);
    let loc = localizer(store, source, LocaleConfig::default());
    let mut page =
        Page::parse(r#"<div data-t="outer"><span data-t="inner">a</span></div>"#);

    let report = loc.apply_language(&mut page, "en").await.unwrap();
    assert_eq!(page.to_html(), r#"<div data-t="outer">Outer</div>"#);
    assert_eq!(report.translated, 1);
    assert!(report.untouched.is_empty());
}

#[tokio::test]
async fn test_deeply_nested_page() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store, StaticSource::new(TABLE), LocaleConfig::default());
    let depth = 200_000;
    let mut page = Page::parse(&format!(
        r#"{}<h1 data-t="title">Default</h1>{}"#,
        "<div>".repeat(depth),
        "</div>".repeat(depth)
    ));

    let report = loc.apply_language(&mut page, "fr").await.unwrap();
    assert_eq!(report.translated, 1);
    assert!(page
        .to_html()
        .contains(r#"<h1 data-t="title">Bonjour</h1>"#));
}

#[tokio::test]
async fn test_audit_lists_missing_keys() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let source = StaticSource::new(r#"{"en":{"title":"Hello","cta":" "}}"#);
    let loc = localizer(store.clone(), source, LocaleConfig::default());
    let page = Page::parse(
        r#"<h1 data-t="title">x</h1><a data-t="cta">x</a><p data-t="about">x</p><p data-t="about">y</p>"#,
    );

    let missing = loc.audit(&page, "en").await.unwrap();
    assert_eq!(missing, vec!["about", "cta"]);
    // Audit never touches the preference.
    assert_eq!(store.get("lang").await.unwrap(), None);
}

#[tokio::test]
async fn test_audit_unknown_language() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store, StaticSource::new(TABLE), LocaleConfig::default());
    let page = Page::parse(r#"<h1 data-t="title">x</h1>"#);
    assert!(matches!(
        loc.audit(&page, "de").await.unwrap_err(),
        LocaleError::MissingLanguage(_)
    ));
}

#[tokio::test]
async fn test_active_language() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let loc = localizer(store.clone(), StaticSource::new(TABLE), LocaleConfig::default());
    assert_eq!(loc.active_language().await.unwrap(), "en");
    store.set("lang", "bn").await.unwrap();
    assert_eq!(loc.active_language().await.unwrap(), "bn");
}
