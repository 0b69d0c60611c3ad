use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::Config;

/// Name of the per-directory config file, overlaid on the platform config.
pub const LOCAL_CONFIG_FILE: &str = ".paperlist.toml";

/// On-disk TOML configuration structure.
/// All fields are optional so partial configs work (merge with defaults).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    pub api_keys: Option<ApiKeysConfig>,
    pub lookup: Option<LookupConfig>,
    pub cache: Option<CacheConfig>,
    pub report: Option<ReportConfig>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ApiKeysConfig {
    pub s2_api_key: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LookupConfig {
    pub base_url: Option<String>,
    pub timeout_secs: Option<u64>,
    pub requests_per_second: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    pub path: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReportConfig {
    pub heading_base: Option<usize>,
    pub author_separator: Option<String>,
    pub strip_title_punctuation: Option<bool>,
    pub show_citation_count: Option<bool>,
    pub header_path: Option<String>,
    pub footer_path: Option<String>,
}

/// Platform config directory path: `<config_dir>/paperlist/config.toml`.
pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("paperlist").join("config.toml"))
}

/// Load config by cascading CWD `.paperlist.toml` over platform config.
/// CWD values override platform values.
pub fn load_config() -> ConfigFile {
    let platform = config_path().and_then(|p| load_from_path(&p));
    let cwd = load_from_path(Path::new(LOCAL_CONFIG_FILE));

    match (platform, cwd) {
        (None, None) => ConfigFile::default(),
        (Some(p), None) => p,
        (None, Some(c)) => c,
        (Some(p), Some(c)) => merge(p, c),
    }
}

/// Load a config from a specific path. Returns `None` if the file doesn't
/// exist or can't be parsed.
pub fn load_from_path(path: &Path) -> Option<ConfigFile> {
    let content = std::fs::read_to_string(path).ok()?;
    match toml::from_str(&content) {
        Ok(config) => {
            tracing::debug!(path = %path.display(), "loaded config file");
            Some(config)
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "ignoring unparseable config file");
            None
        }
    }
}

/// The overlay's value for one field if set, else the base's.
fn pick<S, T>(overlay: &Option<S>, base: &Option<S>, field: impl Fn(&S) -> Option<T>) -> Option<T> {
    overlay
        .as_ref()
        .and_then(&field)
        .or_else(|| base.as_ref().and_then(&field))
}

/// Merge two configs: `overlay` values take precedence over `base`.
pub fn merge(base: ConfigFile, overlay: ConfigFile) -> ConfigFile {
    let (ba, oa) = (&base.api_keys, &overlay.api_keys);
    let (bl, ol) = (&base.lookup, &overlay.lookup);
    let (bc, oc) = (&base.cache, &overlay.cache);
    let (br, or) = (&base.report, &overlay.report);

    ConfigFile {
        api_keys: Some(ApiKeysConfig {
            s2_api_key: pick(oa, ba, |a| a.s2_api_key.clone()),
        }),
        lookup: Some(LookupConfig {
            base_url: pick(ol, bl, |l| l.base_url.clone()),
            timeout_secs: pick(ol, bl, |l| l.timeout_secs),
            requests_per_second: pick(ol, bl, |l| l.requests_per_second),
        }),
        cache: Some(CacheConfig {
            path: pick(oc, bc, |c| c.path.clone()),
        }),
        report: Some(ReportConfig {
            heading_base: pick(or, br, |r| r.heading_base),
            author_separator: pick(or, br, |r| r.author_separator.clone()),
            strip_title_punctuation: pick(or, br, |r| r.strip_title_punctuation),
            show_citation_count: pick(or, br, |r| r.show_citation_count),
            header_path: pick(or, br, |r| r.header_path.clone()),
            footer_path: pick(or, br, |r| r.footer_path.clone()),
        }),
    }
}

impl ConfigFile {
    /// Overwrite the fields of `config` that this file sets.
    pub fn apply_to(&self, config: &mut Config) {
        if let Some(key) = self.api_keys.as_ref().and_then(|a| a.s2_api_key.clone()) {
            config.s2_api_key = Some(key);
        }
        if let Some(lookup) = &self.lookup {
            if let Some(url) = &lookup.base_url {
                config.s2_base_url = url.clone();
            }
            if let Some(secs) = lookup.timeout_secs {
                config.timeout_secs = secs;
            }
            if lookup.requests_per_second.is_some() {
                config.requests_per_second = lookup.requests_per_second;
            }
        }
        if let Some(path) = self.cache.as_ref().and_then(|c| c.path.as_ref()) {
            config.cache_path = PathBuf::from(path);
        }
        if let Some(report) = &self.report {
            if let Some(sep) = &report.author_separator {
                config.render.author_separator = sep.clone();
            }
            if let Some(strip) = report.strip_title_punctuation {
                config.render.strip_title_punctuation = strip;
            }
            if let Some(show) = report.show_citation_count {
                config.render.show_citation_count = show;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_section_round_trip_toml() {
        let config = ConfigFile {
            report: Some(ReportConfig {
                heading_base: Some(2),
                author_separator: Some(" ".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let toml_str = toml::to_string_pretty(&config).unwrap();
        let parsed: ConfigFile = toml::from_str(&toml_str).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn absent_fields_deserialize_as_none() {
        let toml_str = "[lookup]\ntimeout_secs = 30\n";
        let parsed: ConfigFile = toml::from_str(toml_str).unwrap();
        let lookup = parsed.lookup.unwrap();
        assert_eq!(lookup.timeout_secs, Some(30));
        assert!(lookup.base_url.is_none());
        assert!(parsed.cache.is_none());
    }

    #[test]
    fn merge_overlay_wins_and_base_fills_gaps() {
        let base = ConfigFile {
            api_keys: Some(ApiKeysConfig {
                s2_api_key: Some("base-key".to_string()),
            }),
            cache: Some(CacheConfig {
                path: Some("/base/cache.json".to_string()),
            }),
            ..Default::default()
        };
        let overlay = ConfigFile {
            cache: Some(CacheConfig {
                path: Some("/overlay/cache.json".to_string()),
            }),
            ..Default::default()
        };
        let merged = merge(base, overlay);
        assert_eq!(
            merged.cache.unwrap().path.as_deref(),
            Some("/overlay/cache.json")
        );
        assert_eq!(merged.api_keys.unwrap().s2_api_key.as_deref(), Some("base-key"));
    }

    #[test]
    fn unparseable_file_is_ignored() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("config.toml");
        std::fs::write(&path, "this is = = not toml").unwrap();
        assert!(load_from_path(&path).is_none());
        assert!(load_from_path(&tmp.path().join("missing.toml")).is_none());
    }

    #[test]
    fn apply_to_overrides_only_set_fields() {
        let file: ConfigFile = toml::from_str(
            r#"
            [lookup]
            timeout_secs = 25

            [cache]
            path = "lit/cache.json"

            [report]
            show_citation_count = false
            "#,
        )
        .unwrap();
        let mut config = Config::default();
        file.apply_to(&mut config);

        assert_eq!(config.timeout_secs, 25);
        assert_eq!(config.cache_path, PathBuf::from("lit/cache.json"));
        assert!(!config.render.show_citation_count);
        assert_eq!(config.render.author_separator, ", ");
        assert!(config.s2_api_key.is_none());
    }
}
