use marketlens_config::MarketLensConfigLoader;
use serial_test::serial;
use std::{fs, path::PathBuf};
use tempfile::TempDir;

/// Helper to write a YAML file in a temp dir and return its path.
fn write_yaml(tmp: &TempDir, name: &str, yaml: &str) -> PathBuf {
    let p = tmp.path().join(name);
    fs::write(&p, yaml).expect("write yaml");
    p
}

#[test]
#[serial]
fn file_values_load_and_placeholders_expand() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
api:
  key: "${SERPAPI_KEY}"
  timeout_secs: 10
search:
  term: "wireless earbuds"
  marketplace: "amazon.de"
  pages: 3
filters:
  include_sponsored: false
  min_rating: 4.0
  min_reviews: 100
"#;
    let p = write_yaml(&tmp, "marketlens.yaml", file_yaml);

    temp_env::with_var("SERPAPI_KEY", Some("k-from-env"), || {
        let config = MarketLensConfigLoader::new()
            .with_file(&p)
            .load()
            .expect("load config");

        assert_eq!(config.api.key.as_deref(), Some("k-from-env"));
        assert_eq!(config.api.timeout_secs, Some(10));
        assert_eq!(config.search.term.as_deref(), Some("wireless earbuds"));
        assert_eq!(config.search.marketplace, "amazon.de");
        assert_eq!(config.search.pages, 3);
        assert!(!config.filters.include_sponsored);
        assert!(config.filters.include_organic);
        assert_eq!(config.filters.min_rating, Some(4.0));
        assert_eq!(config.filters.min_reviews, 100);
    });
}

#[test]
#[serial]
fn environment_overrides_file_values() {
    let tmp = TempDir::new().unwrap();

    let file_yaml = r#"
api:
  key: "file-key"
search:
  term: "usb hub"
  pages: 1
"#;
    let p = write_yaml(&tmp, "marketlens.yaml", file_yaml);

    temp_env::with_vars(
        [
            ("MARKETLENS_API__KEY", Some("env-key")),
            ("MARKETLENS_SEARCH__PAGES", Some("4")),
            ("MARKETLENS_FILTERS__MIN_RATING", Some("4.5")),
        ],
        || {
            let config = MarketLensConfigLoader::new()
                .with_file(&p)
                .load()
                .expect("load config");

            assert_eq!(config.api.key.as_deref(), Some("env-key"));
            assert_eq!(config.search.pages, 4);
            assert_eq!(config.search.term.as_deref(), Some("usb hub"));
            assert_eq!(config.filters.min_rating, Some(4.5));
        },
    );
}

#[test]
#[serial]
fn env_only_configuration_needs_no_file() {
    temp_env::with_vars(
        [
            ("MARKETLENS_API__KEY", Some("env-only-key")),
            ("MARKETLENS_SEARCH__TERM", Some("mechanical keyboard")),
        ],
        || {
            let config = MarketLensConfigLoader::new().load().expect("load config");

            assert_eq!(config.api.key.as_deref(), Some("env-only-key"));
            assert_eq!(config.search.term.as_deref(), Some("mechanical keyboard"));
            assert_eq!(config.search.marketplace, "amazon.com");
            assert_eq!(config.search.pages, 1);
        },
    );
}

#[test]
#[serial]
fn a_missing_file_is_a_hard_error() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("nope.yaml");

    let err = MarketLensConfigLoader::new()
        .with_file(&missing)
        .load()
        .expect_err("missing file should fail");

    assert!(err.to_string().contains("nope.yaml"));
}
