//! Loader for MarketLens configuration with YAML + environment overlays.
//!
//! Sources merge in precedence order: struct defaults, then files and inline
//! YAML in the order they are attached, then `MARKETLENS_`-prefixed
//! environment variables (`MARKETLENS_API__KEY` maps to `api.key`; the `__`
//! separator steps into sections). `${VAR}` placeholders inside string values
//! are expanded after merging, so a checked-in file can reference secrets
//! without containing them.
use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use serde_json::Value;
use std::path::Path;

const MAXIMUM_ENV_EXPANSION_DEPTH: usize = 8;

#[derive(Debug, Default, Deserialize)]
pub struct MarketLensConfig {
    #[serde(default)]
    pub api: ApiSettings,
    #[serde(default)]
    pub search: SearchSettings,
    #[serde(default)]
    pub filters: FilterSettings,
    #[serde(default)]
    pub log: LogSettings,
}

/// Credentials and transport tuning for the SerpAPI client.
#[derive(Debug, Default, Deserialize)]
pub struct ApiSettings {
    /// Usually `${SERPAPI_KEY}` in the file rather than the key itself.
    #[serde(default)]
    pub key: Option<String>,
    /// Alternate endpoint, for proxies and mock servers.
    #[serde(default)]
    pub base_url: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
    #[serde(default)]
    pub max_retries: Option<u32>,
}

/// What to search, where, and how many result pages to walk.
#[derive(Debug, Deserialize)]
pub struct SearchSettings {
    #[serde(default)]
    pub term: Option<String>,
    #[serde(default = "default_marketplace")]
    pub marketplace: String,
    #[serde(default = "default_pages")]
    pub pages: u32,
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            term: None,
            marketplace: default_marketplace(),
            pages: default_pages(),
        }
    }
}

/// Listing filters applied after validation and dedup.
#[derive(Debug, Deserialize)]
pub struct FilterSettings {
    #[serde(default = "default_true")]
    pub include_sponsored: bool,
    #[serde(default = "default_true")]
    pub include_organic: bool,
    #[serde(default)]
    pub min_rating: Option<f32>,
    #[serde(default)]
    pub min_reviews: u32,
    #[serde(default)]
    pub min_price: Option<f64>,
    #[serde(default)]
    pub max_price: Option<f64>,
}

impl Default for FilterSettings {
    fn default() -> Self {
        Self {
            include_sponsored: true,
            include_organic: true,
            min_rating: None,
            min_reviews: 0,
            min_price: None,
            max_price: None,
        }
    }
}

/// Log sink settings consumed by the binary at startup.
#[derive(Debug, Default, Deserialize)]
pub struct LogSettings {
    /// Directory for the rolling log file.
    #[serde(default)]
    pub dir: Option<String>,
    #[serde(default)]
    pub stderr: bool,
    /// "text" or "json".
    #[serde(default)]
    pub format: Option<String>,
    /// Default tracing filter when `RUST_LOG` is unset.
    #[serde(default)]
    pub filter: Option<String>,
}

fn default_marketplace() -> String {
    "amazon.com".into()
}
fn default_pages() -> u32 {
    1
}
fn default_true() -> bool {
    true
}

fn expand_env_in_value(v: &mut Value) {
    match v {
        Value::String(s) => {
            if s.contains('$') {
                let mut cur = std::mem::take(s);
                for _ in 0..MAXIMUM_ENV_EXPANSION_DEPTH {
                    let expanded = match shellexpand::env(&cur) {
                        Ok(cow) => cow.into_owned(),
                        Err(_) => cur.clone(),
                    };
                    if expanded == cur {
                        break;
                    }
                    cur = expanded;
                }
                *s = cur;
            }
        }
        Value::Array(arr) => arr.iter_mut().for_each(expand_env_in_value),
        Value::Object(obj) => obj.values_mut().for_each(expand_env_in_value),
        _ => {}
    }
}

/// Builder hides the `config` crate wiring (YAML file + env overrides).
pub struct MarketLensConfigLoader {
    builder: config::ConfigBuilder<config::builder::DefaultState>,
}

impl Default for MarketLensConfigLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl MarketLensConfigLoader {
    /// Start an empty loader. File sources are attached explicitly; the
    /// `MARKETLENS_` environment overlay is merged last by [`load`](Self::load).
    ///
    /// ```
    /// use marketlens_config::MarketLensConfigLoader;
    ///
    /// let config = MarketLensConfigLoader::new()
    ///     .with_yaml_str("search:\n  term: \"wireless earbuds\"\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert_eq!(config.search.term.as_deref(), Some("wireless earbuds"));
    /// assert_eq!(config.search.marketplace, "amazon.com");
    /// assert_eq!(config.search.pages, 1);
    /// ```
    pub fn new() -> Self {
        Self {
            builder: Config::builder(),
        }
    }

    /// Attach a YAML/TOML/JSON file; the `config` crate infers format by suffix.
    // FIXME(config): a missing file is a hard error here, so env-only
    // deployments have to stat the path before calling this.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.builder = self
            .builder
            .add_source(File::from(path.as_ref()).required(true));
        self
    }

    /// Merge an inline YAML snippet; later sources override earlier ones.
    ///
    /// ```
    /// use marketlens_config::MarketLensConfigLoader;
    ///
    /// let config = MarketLensConfigLoader::new()
    ///     .with_yaml_str("filters:\n  include_sponsored: false\n")
    ///     .with_yaml_str("search:\n  pages: 2\n")
    ///     .load()
    ///     .expect("valid config");
    ///
    /// assert!(!config.filters.include_sponsored);
    /// assert!(config.filters.include_organic);
    /// assert_eq!(config.search.pages, 2);
    /// ```
    pub fn with_yaml_str(mut self, yaml: &str) -> Self {
        self.builder = self
            .builder
            .add_source(File::from_str(yaml, config::FileFormat::Yaml));
        self
    }

    /// Merge all sources and deserialize into [`MarketLensConfig`].
    ///
    /// Environment variables win over file values, and `${VAR}` placeholders
    /// inside strings are expanded afterwards, up to a fixed depth.
    ///
    /// ```
    /// use marketlens_config::MarketLensConfigLoader;
    ///
    /// let config = temp_env::with_var("SERPAPI_KEY", Some("k-demo"), || {
    ///     MarketLensConfigLoader::new()
    ///         .with_yaml_str("api:\n  key: \"${SERPAPI_KEY}\"\n")
    ///         .load()
    ///         .expect("valid config")
    /// });
    ///
    /// assert_eq!(config.api.key.as_deref(), Some("k-demo"));
    /// ```
    pub fn load(self) -> Result<MarketLensConfig, ConfigError> {
        let cfg = self
            .builder
            .add_source(
                Environment::with_prefix("MARKETLENS")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        // Convert to serde_json::Value first so placeholders can be expanded
        // uniformly, then materialise the typed config.
        let mut v: Value = cfg.try_deserialize()?;
        expand_env_in_value(&mut v);

        serde_json::from_value(v).map_err(|e| ConfigError::Message(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn expands_simple_string() {
        temp_env::with_var("MARKET", Some("amazon.de"), || {
            let mut v = json!("marketplace-${MARKET}");
            expand_env_in_value(&mut v);
            assert_eq!(v, json!("marketplace-amazon.de"));
        });
    }

    #[test]
    fn expands_in_array_and_object() {
        temp_env::with_vars([("TERM", Some("earbuds")), ("PAGES", Some("3"))], || {
            let mut v = json!([
                "search-$TERM",
                { "plan": "${TERM}/${PAGES}" },
                7,
                false,
                null
            ]);
            expand_env_in_value(&mut v);
            assert_eq!(
                v,
                json!(["search-earbuds", { "plan": "earbuds/3" }, 7, false, null])
            );
        });
    }

    #[test]
    fn expands_recursively_across_env_values() {
        temp_env::with_vars(
            [
                // DOMAIN references REGION; ENDPOINT references DOMAIN.
                ("REGION", Some("de")),
                ("DOMAIN", Some("amazon.${REGION}")),
                ("ENDPOINT", Some("https://${DOMAIN}/s")),
            ],
            || {
                let mut v = json!("${ENDPOINT}");
                // Without recursive expansion this would stop at
                // "https://amazon.${REGION}/s".
                expand_env_in_value(&mut v);
                assert_eq!(v, json!("https://amazon.de/s"));
            },
        );
    }

    #[test]
    fn stops_on_cycles_and_leaves_value_reasonable() {
        temp_env::with_vars([("A", Some("${B}")), ("B", Some("${A}"))], || {
            let mut v = json!("key=${A}");
            // The depth cap guarantees termination; the cycle itself stays
            // unresolved.
            expand_env_in_value(&mut v);
            let s = v.as_str().unwrap();
            assert!(s.starts_with("key="));
            assert!(s.contains("${"));
        });
    }

    #[test]
    fn unknown_vars_are_left_as_is() {
        let mut v = json!("${MARKETLENS_DOES_NOT_EXIST}");
        expand_env_in_value(&mut v);
        assert_eq!(v, json!("${MARKETLENS_DOES_NOT_EXIST}"));
    }

    #[test]
    fn defaults_fill_every_missing_section() {
        let config: MarketLensConfig = serde_json::from_value(json!({})).unwrap();
        assert!(config.api.key.is_none());
        assert_eq!(config.search.marketplace, "amazon.com");
        assert_eq!(config.search.pages, 1);
        assert!(config.filters.include_sponsored);
        assert!(config.filters.include_organic);
        assert_eq!(config.filters.min_reviews, 0);
        assert!(!config.log.stderr);
    }
}
