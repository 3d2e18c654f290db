//! Configuration file support.
//!
//! Discovered with `prefer` (`anexos.toml`, `anexos.yaml`, `anexos.json` in
//! the standard locations) or loaded from an explicit path, then adjusted by
//! environment variables.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::scrapers::BrowserEngineConfig;

/// ANS page listing the current procedure-list attachments.
pub const DEFAULT_PAGE_URL: &str = "https://www.gov.br/ans/pt-br/acesso-a-informacao/participacao-da-sociedade/atualizacao-do-rol-de-procedimentos";

/// Discovery tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Assign identities by DOM order when the rendered page has no usable
    /// labels.
    #[serde(default = "default_true")]
    pub positional_fallback: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            positional_fallback: true,
        }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Page carrying the attachment links.
    #[serde(default = "default_page_url")]
    pub page_url: String,

    /// Where downloads and the archive are written.
    #[serde(default = "default_output_dir")]
    pub output_dir: String,

    /// Archive file name, inside `output_dir`.
    #[serde(default = "default_archive_name")]
    pub archive_name: String,

    #[serde(default = "default_document_extension")]
    pub document_extension: String,

    /// Identities the static pass must find before the browser is skipped.
    #[serde(default = "default_required_count")]
    pub required_count: usize,

    /// User agent; "impersonate" picks a real browser's.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Page fetch timeout in seconds.
    #[serde(default = "default_timeout")]
    pub request_timeout: u64,

    /// Per-document download timeout in seconds.
    #[serde(default = "default_timeout")]
    pub download_timeout: u64,

    #[serde(default = "default_download_workers")]
    pub download_workers: usize,

    /// Delete the downloaded files once they are in the archive.
    #[serde(default)]
    pub remove_after_archive: bool,

    /// Mirror the log to this file.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<String>,

    #[serde(default)]
    pub browser: BrowserEngineConfig,

    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// Path to the config file this was loaded from (not serialized).
    #[serde(skip)]
    pub source_path: Option<PathBuf>,
}

fn default_page_url() -> String {
    DEFAULT_PAGE_URL.to_string()
}

fn default_output_dir() -> String {
    "downloads".to_string()
}

fn default_archive_name() -> String {
    "anexos.zip".to_string()
}

fn default_document_extension() -> String {
    "pdf".to_string()
}

fn default_required_count() -> usize {
    2
}

fn default_user_agent() -> String {
    "impersonate".to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_download_workers() -> usize {
    1
}

fn default_true() -> bool {
    true
}

impl Default for Config {
    fn default() -> Self {
        Self {
            page_url: default_page_url(),
            output_dir: default_output_dir(),
            archive_name: default_archive_name(),
            document_extension: default_document_extension(),
            required_count: default_required_count(),
            user_agent: default_user_agent(),
            request_timeout: default_timeout(),
            download_timeout: default_timeout(),
            download_workers: default_download_workers(),
            remove_after_archive: false,
            log_file: None,
            browser: BrowserEngineConfig::default(),
            discovery: DiscoveryConfig::default(),
            source_path: None,
        }
    }
}

impl Config {
    /// Load configuration using prefer for discovery.
    /// Falls back to defaults when no file is found or it fails to parse.
    pub async fn load() -> Self {
        let discovered = match prefer::load("anexos").await {
            Ok(pref_config) => pref_config.source_path().map(|p| p.to_path_buf()),
            Err(_) => None,
        };

        let config = match discovered {
            Some(path) => match Self::load_from_path(&path).await {
                Ok(config) => return config,
                Err(e) => {
                    eprintln!("Ignoring {}: {}", path.display(), e);
                    Self::default()
                }
            },
            None => Self::default(),
        };
        config.with_env_overrides()
    }

    /// Load configuration from a specific file path.
    /// TOML and YAML by extension, JSON otherwise.
    pub async fn load_from_path(path: &Path) -> Result<Self, String> {
        let contents = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| format!("Failed to read config file: {}", e))?;

        let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

        let mut config: Config = match ext {
            "toml" => toml::from_str(&contents)
                .map_err(|e| format!("Failed to parse TOML config: {}", e))?,
            "yaml" | "yml" => serde_yaml::from_str(&contents)
                .map_err(|e| format!("Failed to parse YAML config: {}", e))?,
            _ => serde_json::from_str(&contents)
                .map_err(|e| format!("Failed to parse JSON config: {}", e))?,
        };

        config.source_path = Some(path.to_path_buf());
        Ok(config.with_env_overrides())
    }

    /// Apply `ANEXOS_*` and browser environment variables.
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(url) = std::env::var("ANEXOS_PAGE_URL") {
            self.page_url = url;
        }
        if let Ok(dir) = std::env::var("ANEXOS_OUTPUT_DIR") {
            self.output_dir = dir;
        }
        if let Ok(ua) = std::env::var("ANEXOS_USER_AGENT") {
            self.user_agent = ua;
        }
        if let Ok(log_file) = std::env::var("ANEXOS_LOG_FILE") {
            self.log_file = Some(log_file);
        }
        self.browser = self.browser.with_env_overrides();
        self
    }

    /// Directory relative paths resolve against: the config file's parent,
    /// or the working directory.
    pub fn base_dir(&self) -> PathBuf {
        self.source_path
            .as_ref()
            .and_then(|p| p.parent().map(|p| p.to_path_buf()))
            .unwrap_or_else(|| PathBuf::from("."))
    }

    /// Resolve a path that may be relative to the config file.
    /// - Absolute paths are returned as-is
    /// - Paths starting with ~ are expanded
    /// - Relative paths are resolved against [`Config::base_dir`]
    pub fn resolve_path(&self, path_str: &str) -> PathBuf {
        let expanded = shellexpand::tilde(path_str);
        let path = Path::new(expanded.as_ref());

        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.base_dir().join(path)
        }
    }

    pub fn page_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.page_url)
    }

    pub fn output_dir(&self) -> PathBuf {
        self.resolve_path(&self.output_dir)
    }

    pub fn archive_path(&self) -> PathBuf {
        self.output_dir().join(&self.archive_name)
    }

    pub fn log_file(&self) -> Option<PathBuf> {
        self.log_file.as_deref().map(|p| self.resolve_path(p))
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout)
    }

    pub fn download_timeout(&self) -> Duration {
        Duration::from_secs(self.download_timeout)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;
    use tempfile::tempdir;

    /// Tests that read or write process environment variables hold this.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    const ENV_VARS: &[&str] = &[
        "ANEXOS_PAGE_URL",
        "ANEXOS_OUTPUT_DIR",
        "ANEXOS_USER_AGENT",
        "ANEXOS_LOG_FILE",
        "ANEXOS_BROWSER",
        "BROWSER_URL",
    ];

    /// Sets variables for the duration of a test and restores the previous
    /// values on drop.
    struct EnvGuard {
        saved: Vec<(&'static str, Option<String>)>,
    }

    impl EnvGuard {
        fn set(vars: &[(&'static str, &str)]) -> Self {
            let saved = ENV_VARS
                .iter()
                .map(|name| (*name, std::env::var(name).ok()))
                .collect();
            for name in ENV_VARS {
                std::env::remove_var(name);
            }
            for (name, value) in vars {
                std::env::set_var(name, value);
            }
            Self { saved }
        }
    }

    impl Drop for EnvGuard {
        fn drop(&mut self) {
            for (name, value) in &self.saved {
                match value {
                    Some(v) => std::env::set_var(name, v),
                    None => std::env::remove_var(name),
                }
            }
        }
    }

    #[test]
    fn test_env_overrides() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvGuard::set(&[
            ("ANEXOS_PAGE_URL", "https://example.com/rol"),
            ("ANEXOS_OUTPUT_DIR", "/tmp/anexos-env"),
            ("ANEXOS_USER_AGENT", "Coletor/2.0"),
            ("ANEXOS_LOG_FILE", "anexos.log"),
            ("ANEXOS_BROWSER", "off"),
            ("BROWSER_URL", "ws://localhost:9222"),
        ]);

        let config = Config::default().with_env_overrides();

        assert_eq!(config.page_url, "https://example.com/rol");
        assert_eq!(config.output_dir(), PathBuf::from("/tmp/anexos-env"));
        assert_eq!(config.user_agent, "Coletor/2.0");
        assert_eq!(config.log_file(), Some(PathBuf::from("./anexos.log")));
        assert!(!config.browser.enabled);
        assert_eq!(config.browser.remote_url.as_deref(), Some("ws://localhost:9222"));
    }

    #[test]
    fn test_env_overrides_absent_keep_values() {
        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvGuard::set(&[("ANEXOS_BROWSER", "1")]);

        let config = Config::default().with_env_overrides();

        assert_eq!(config.page_url, DEFAULT_PAGE_URL);
        assert_eq!(config.output_dir, "downloads");
        assert!(config.browser.enabled);
        assert!(config.browser.remote_url.is_none());
    }

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert_eq!(config.page_url, DEFAULT_PAGE_URL);
        assert_eq!(config.archive_name, "anexos.zip");
        assert_eq!(config.required_count, 2);
        assert_eq!(config.download_workers, 1);
        assert_eq!(config.download_timeout(), Duration::from_secs(30));
        assert!(config.discovery.positional_fallback);
        assert!(config.browser.enabled);
        assert!(config.page_url().is_ok());
    }

    #[tokio::test]
    async fn test_load_toml_resolves_relative_paths() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anexos.toml");
        std::fs::write(
            &path,
            r#"
output_dir = "saida"
archive_name = "rol.zip"
download_workers = 2

[browser]
settle_delay_ms = 500

[discovery]
positional_fallback = false
"#,
        )
        .unwrap();

        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvGuard::set(&[]);
        let config = Config::load_from_path(&path).await.unwrap();

        assert_eq!(config.archive_name, "rol.zip");
        assert_eq!(config.download_workers, 2);
        assert_eq!(config.browser.settle_delay_ms, 500);
        assert_eq!(config.browser.body_timeout, 20);
        assert!(!config.discovery.positional_fallback);
        assert_eq!(config.archive_path(), dir.path().join("saida").join("rol.zip"));
    }

    #[tokio::test]
    async fn test_load_yaml() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anexos.yml");
        std::fs::write(&path, "remove_after_archive: true\nrequired_count: 1\n").unwrap();

        let _lock = ENV_LOCK.lock().unwrap_or_else(|e| e.into_inner());
        let _env = EnvGuard::set(&[]);
        let config = Config::load_from_path(&path).await.unwrap();
        assert!(config.remove_after_archive);
        assert_eq!(config.required_count, 1);
    }

    #[tokio::test]
    async fn test_load_invalid_json_fails() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anexos.json");
        std::fs::write(&path, "{ not json").unwrap();

        let err = Config::load_from_path(&path).await.unwrap_err();
        assert!(err.contains("JSON"));
    }

    #[test]
    fn test_resolve_absolute_path_unchanged() {
        let config = Config::default();
        let abs = std::env::temp_dir().join("anexos");
        assert_eq!(config.resolve_path(abs.to_str().unwrap()), abs);
    }
}
