use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Hard safety ceiling on the cumulative byte size of one selection: packing
/// more than this aborts outright rather than buffering it all in memory.
pub const SIZE_CAP_BYTES: u64 = 1024 * 1024; // 1 MiB

/// Token-limit range enforced at the caller boundary (CLI / embedding UI).
pub const TOKEN_LIMIT_MIN: usize = 2_000;
pub const TOKEN_LIMIT_MAX: usize = 50_000;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BatchConfig {
    /// Max true token cost of one emitted batch document.
    pub token_limit: usize,
    /// Substrings that disqualify a selected path (compared against the full
    /// path, not just components).
    pub exclusions: Vec<String>,
    /// Cumulative byte cap across one selection; exceeding it aborts the pack.
    pub size_cap_bytes: u64,
}

impl Default for BatchConfig {
    fn default() -> Self {
        Self {
            token_limit: 7_500,
            exclusions: vec!["node_modules".to_string(), ".git".to_string()],
            size_cap_bytes: SIZE_CAP_BYTES,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    /// Divisor for the heuristic counter. A BPE-backed counter ignores this.
    pub chars_per_token: usize,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self { chars_per_token: 4 }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub output_dir: PathBuf,
    pub batch: BatchConfig,
    pub tokenizer: TokenizerConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from(".promptpack"),
            batch: BatchConfig::default(),
            tokenizer: TokenizerConfig::default(),
        }
    }
}

pub fn load_config(root: &Path) -> Config {
    let primary = root.join(".promptpack.json");

    let text = std::fs::read_to_string(&primary);
    let Ok(text) = text else { return Config::default() };

    serde_json::from_str::<Config>(&text).unwrap_or_else(|_| Config::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn missing_config_falls_back_to_defaults() {
        let tmp = TempDir::new().unwrap();
        let cfg = load_config(tmp.path());
        assert_eq!(cfg.batch.token_limit, 7_500);
        assert_eq!(cfg.batch.size_cap_bytes, SIZE_CAP_BYTES);
        assert_eq!(cfg.batch.exclusions, vec!["node_modules", ".git"]);
    }

    #[test]
    fn partial_config_keeps_defaults_for_absent_fields() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(
            tmp.path().join(".promptpack.json"),
            r#"{ "batch": { "token_limit": 12000 } }"#,
        )
        .unwrap();
        let cfg = load_config(tmp.path());
        assert_eq!(cfg.batch.token_limit, 12_000);
        assert_eq!(cfg.batch.exclusions, vec!["node_modules", ".git"]);
        assert_eq!(cfg.tokenizer.chars_per_token, 4);
    }

    #[test]
    fn invalid_json_fails_open_to_defaults() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join(".promptpack.json"), "{ not json").unwrap();
        let cfg = load_config(tmp.path());
        assert_eq!(cfg.batch.token_limit, 7_500);
    }
}
