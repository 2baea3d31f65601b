use std::path::{Path, PathBuf};
use std::time::Duration;

use crossterm::event::KeyCode;
use serde::Deserialize;

use crate::runtime::pool::PoolConfig;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub general: GeneralConfig,
    pub info: InfoConfig,
    pub monitor: MonitorConfig,
    pub runtime: RuntimeConfig,
    pub keybinds: KeybindsConfig,
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    pub log_level: String,
    pub provider: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        GeneralConfig {
            log_level: "info".to_string(),
            provider: "auto".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct InfoConfig {
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
    pub top_processes: usize,
}

impl Default for InfoConfig {
    fn default() -> Self {
        InfoConfig {
            refresh_interval_secs: 30,
            auto_refresh: true,
            top_processes: 15,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    pub refresh_interval_secs: u64,
    pub auto_refresh: bool,
    pub default_sort: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        MonitorConfig {
            refresh_interval_secs: 2,
            auto_refresh: true,
            default_sort: "none".to_string(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub worker_threads: usize,
    pub probe_concurrency: usize,
    pub shutdown_grace_ms: u64,
    pub cache_ttl_ms: u64,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        RuntimeConfig {
            worker_threads: 2,
            probe_concurrency: 10,
            shutdown_grace_ms: 5000,
            cache_ttl_ms: 1000,
        }
    }
}

impl RuntimeConfig {
    pub fn pool(&self) -> PoolConfig {
        PoolConfig {
            workers: self.worker_threads.max(1),
            probe_concurrency: self.probe_concurrency.max(1),
            shutdown_grace: Duration::from_millis(self.shutdown_grace_ms),
        }
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_millis(self.cache_ttl_ms)
    }
}

#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct KeybindsConfig {
    pub quit: String,
    pub refresh: String,
    pub toggle_auto_refresh: String,
    pub end_process: String,
    pub filter: String,
    pub cycle_sort: String,
    pub next_tab: String,
}

impl Default for KeybindsConfig {
    fn default() -> Self {
        KeybindsConfig {
            quit: "q".to_string(),
            refresh: "r".to_string(),
            toggle_auto_refresh: "a".to_string(),
            end_process: "k".to_string(),
            filter: "/".to_string(),
            cycle_sort: "s".to_string(),
            next_tab: "Tab".to_string(),
        }
    }
}

pub fn config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("process-gopher").join("config.toml"))
}

pub fn load_config() -> Config {
    match config_path() {
        Some(path) if path.exists() => load_config_from_path(&path),
        _ => Config::default(),
    }
}

pub fn load_config_from_path(path: &Path) -> Config {
    match std::fs::read_to_string(path) {
        Ok(contents) => match toml::from_str(&contents) {
            Ok(config) => config,
            Err(err) => {
                tracing::warn!(path = %path.display(), %err, "invalid config, using defaults");
                Config::default()
            }
        },
        Err(_) => Config::default(),
    }
}

/// Parses a keybind: a single character or a named key ("Enter", "Tab",
/// "Esc", "F5", ...). Names are case-insensitive.
pub fn parse_key(s: &str) -> Option<KeyCode> {
    let mut chars = s.chars();
    if let (Some(c), None) = (chars.next(), chars.next()) {
        return Some(KeyCode::Char(c));
    }
    match s.to_lowercase().as_str() {
        "enter" | "return" => Some(KeyCode::Enter),
        "esc" | "escape" => Some(KeyCode::Esc),
        "tab" => Some(KeyCode::Tab),
        "backtab" => Some(KeyCode::BackTab),
        "space" => Some(KeyCode::Char(' ')),
        "backspace" => Some(KeyCode::Backspace),
        "delete" | "del" => Some(KeyCode::Delete),
        other => other
            .strip_prefix('f')
            .and_then(|n| n.parse::<u8>().ok())
            .filter(|n| (1..=12).contains(n))
            .map(KeyCode::F),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_values() {
        let config = Config::default();
        assert_eq!(config.general.provider, "auto");
        assert_eq!(config.info.refresh_interval_secs, 30);
        assert_eq!(config.info.top_processes, 15);
        assert_eq!(config.monitor.refresh_interval_secs, 2);
        assert_eq!(config.runtime.worker_threads, 2);
        assert_eq!(config.runtime.probe_concurrency, 10);
        assert_eq!(config.runtime.cache_ttl(), Duration::from_secs(1));
        assert_eq!(config.keybinds.end_process, "k");
    }

    #[test]
    fn parse_partial_toml() {
        let toml_str = r#"
[monitor]
refresh_interval_secs = 5
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.monitor.refresh_interval_secs, 5);
        assert!(config.monitor.auto_refresh);
        assert_eq!(config.info.refresh_interval_secs, 30);
    }

    #[test]
    fn parse_full_toml() {
        let toml_str = r#"
[general]
log_level = "debug"
provider = "darwin"

[info]
auto_refresh = false
top_processes = 5

[monitor]
default_sort = "memory"

[runtime]
worker_threads = 4
probe_concurrency = 0
shutdown_grace_ms = 250

[keybinds]
quit = "x"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.general.log_level, "debug");
        assert_eq!(config.general.provider, "darwin");
        assert!(!config.info.auto_refresh);
        assert_eq!(config.info.top_processes, 5);
        assert_eq!(config.monitor.default_sort, "memory");
        let pool = config.runtime.pool();
        assert_eq!(pool.workers, 4);
        assert_eq!(pool.probe_concurrency, 1);
        assert_eq!(pool.shutdown_grace, Duration::from_millis(250));
        assert_eq!(config.keybinds.quit, "x");
    }

    #[test]
    fn keybind_names() {
        assert_eq!(parse_key("k"), Some(KeyCode::Char('k')));
        assert_eq!(parse_key("K"), Some(KeyCode::Char('K')));
        assert_eq!(parse_key("Tab"), Some(KeyCode::Tab));
        assert_eq!(parse_key("escape"), Some(KeyCode::Esc));
        assert_eq!(parse_key("F5"), Some(KeyCode::F(5)));
        assert_eq!(parse_key("F13"), None);
        assert_eq!(parse_key("nonsense"), None);
    }

    #[test]
    fn missing_file_returns_default() {
        let config = load_config_from_path(Path::new("/nonexistent/path/config.toml"));
        assert_eq!(config.monitor.refresh_interval_secs, 2);
    }

    #[test]
    fn invalid_toml_returns_default() {
        let temp = std::env::temp_dir().join("process_gopher_test_invalid.toml");
        std::fs::write(&temp, "this is not valid toml {{{{").unwrap();
        let config = load_config_from_path(&temp);
        assert_eq!(config.info.refresh_interval_secs, 30);
        let _ = std::fs::remove_file(&temp);
    }
}
