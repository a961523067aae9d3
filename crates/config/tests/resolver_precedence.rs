//! Override, document and default precedence across loaded documents

use std::fs::{self, File};
use std::path::Path;
use std::time::{Duration, SystemTime};

use pretty_assertions::assert_eq;
use tether_config::{ConfigError, ConfigLoader, ConfigResolver, DocumentSpec, Overrides, SearchPath};

fn write(root: &Path, rel: &str, content: &str) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

fn fixture() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write(
        dir.path(),
        "config/web.json",
        r#"{
            "chrome": {"defaultOptions": {"args": ["--headless"]}},
            "timeouts": {"implicitWait": 10, "pageLoad": 30}
        }"#,
    );
    write(
        dir.path(),
        "config/run_config.json",
        r#"{"browser": "chrome", "remote": false, "threads": "4"}"#,
    );
    dir
}

#[tokio::test]
async fn override_then_document_then_default() {
    let dir = fixture();
    let loader = ConfigLoader::new(SearchPath::new(dir.path()));
    let overrides = Overrides::from_args(["-Dbrowser=firefox", "implicitWait=abc"]);
    let resolver = ConfigResolver::load_lenient(&loader, DocumentSpec::defaults(), overrides)
        .await
        .unwrap();

    assert_eq!(resolver.get_string("browser", "run.browser", "edge"), "firefox");
    // Malformed override falls back to the document, not the default.
    assert_eq!(resolver.get_int("implicitWait", "web.timeouts.implicitWait", 5), 10);
    assert_eq!(resolver.get_int("threads", "run.threads", 1), 4);
    assert!(!resolver.get_bool("remote", "run.remote", true));
    assert_eq!(resolver.get_int("", "application.resources.maxAgeSecs", 1800), 1800);

    resolver.overrides().set("remote", "TRUE");
    assert!(resolver.get_bool("remote", "run.remote", false));
}

#[tokio::test]
async fn strict_load_requires_every_document() {
    let dir = fixture();
    let loader = ConfigLoader::new(SearchPath::new(dir.path()));

    let err = ConfigResolver::load(&loader, DocumentSpec::defaults(), Overrides::new())
        .await
        .unwrap_err();
    assert!(matches!(err, ConfigError::NotFound { .. }), "got {err:?}");

    let lenient = ConfigResolver::load_lenient(&loader, DocumentSpec::defaults(), Overrides::new())
        .await
        .unwrap();
    assert_eq!(lenient.document_names(), vec!["web", "run"]);
}

#[tokio::test]
async fn refresh_picks_up_changed_documents() {
    let dir = fixture();
    let loader = ConfigLoader::new(SearchPath::new(dir.path()));
    let specs = vec![DocumentSpec::web(), DocumentSpec::run()];
    let resolver = ConfigResolver::load(&loader, specs, Overrides::new()).await.unwrap();
    assert_eq!(resolver.get_string("", "run.browser", "x"), "chrome");

    let file = dir.path().join("config/run_config.json");
    fs::write(&file, r#"{"browser": "safari"}"#).unwrap();
    File::options()
        .write(true)
        .open(&file)
        .unwrap()
        .set_modified(SystemTime::now() + Duration::from_secs(5))
        .unwrap();

    // Snapshot is stable until refreshed.
    assert_eq!(resolver.get_string("", "run.browser", "x"), "chrome");
    resolver.refresh(&loader).await.unwrap();
    assert_eq!(resolver.get_string("", "run.browser", "x"), "safari");
}

#[tokio::test]
async fn failed_refresh_keeps_snapshot() {
    let dir = fixture();
    let loader = ConfigLoader::new(SearchPath::new(dir.path()));
    let resolver = ConfigResolver::load(&loader, vec![DocumentSpec::run()], Overrides::new())
        .await
        .unwrap();

    write(dir.path(), "config/run_config.json", "   ");
    loader.invalidate("config/run_config.json");
    assert!(resolver.refresh(&loader).await.is_err());
    assert_eq!(resolver.get_string("", "run.browser", "x"), "chrome");
}
