//! Optional TOML config file for engine defaults and pool locations.
//!
//! Precedence: built-in defaults, then the config file, then command-line
//! flags.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub client: ClientSection,
    pub retry: RetrySection,
    pub pools: PoolsSection,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClientSection {
    pub concurrency: Option<usize>,
    pub limits_per_host: Option<usize>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetrySection {
    pub max_attempts: Option<u32>,
    pub max_elapsed_secs: Option<u64>,
    pub retry_client_errors: Option<bool>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct PoolsSection {
    pub agents_file: Option<PathBuf>,
    pub proxies_file: Option<PathBuf>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        toml::from_str(&raw).with_context(|| format!("parsing config file {}", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_files_leave_other_sections_default() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            "[client]\nconcurrency = 25\nlimits_per_host = 50\n\n[retry]\nmax_attempts = 5"
        )
        .unwrap();

        let config = FileConfig::load(file.path()).unwrap();
        assert_eq!(config.client.concurrency, Some(25));
        assert_eq!(config.client.limits_per_host, Some(50));
        assert_eq!(config.client.timeout_secs, None);
        assert_eq!(config.retry.max_attempts, Some(5));
        assert!(config.pools.agents_file.is_none());
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[client]\nconcurency = 25").unwrap();
        assert!(FileConfig::load(file.path()).is_err());
    }
}
