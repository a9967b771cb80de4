//! User-agent and proxy pools.
//!
//! Pools are explicit immutable configuration loaded once at startup and
//! handed to the request client; there is no hidden global initialization and
//! a load failure surfaces before the first request. Selection is a uniform
//! random draw per request with no memory across calls, so two requests in
//! the same batch may draw differently.

use crate::error::RequestError;
use rand::seq::SliceRandom;
use std::fs;
use std::path::Path;

/// Browser user-agent strings drawn per request when no explicit headers are
/// configured.
#[derive(Debug, Clone)]
pub struct AgentPool {
    agents: Vec<String>,
}

impl AgentPool {
    /// Small built-in pool for runs without an agents file.
    pub fn builtin() -> Self {
        let agents = [
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/17.4 Safari/605.1.15",
            "Mozilla/5.0 (X11; Linux x86_64; rv:125.0) Gecko/20100101 Firefox/125.0",
            "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:125.0) Gecko/20100101 Firefox/125.0",
            "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36",
        ];
        Self {
            agents: agents.iter().map(|s| s.to_string()).collect(),
        }
    }

    /// Load one user agent per non-empty line.
    pub fn from_file(path: &Path) -> Result<Self, RequestError> {
        let agents = read_lines(path)?;
        if agents.is_empty() {
            return Err(RequestError::Configuration(format!(
                "agents file {} contains no user agents",
                path.display()
            )));
        }
        Ok(Self { agents })
    }

    /// A uniformly random user agent from the pool.
    pub fn pick(&self) -> &str {
        self.agents
            .choose(&mut rand::thread_rng())
            .map(String::as_str)
            .unwrap_or("symscout")
    }

    pub fn len(&self) -> usize {
        self.agents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.is_empty()
    }
}

/// Proxy URIs for random-proxy mode, one transport per entry.
#[derive(Debug, Clone)]
pub struct ProxyPool {
    uris: Vec<String>,
}

impl ProxyPool {
    /// Load one proxy URI per non-empty line.
    pub fn from_file(path: &Path) -> Result<Self, RequestError> {
        let uris = read_lines(path)?;
        if uris.is_empty() {
            return Err(RequestError::Configuration(format!(
                "proxies file {} contains no proxies",
                path.display()
            )));
        }
        Ok(Self { uris })
    }

    pub fn from_uris(uris: Vec<String>) -> Self {
        Self { uris }
    }

    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    pub fn len(&self) -> usize {
        self.uris.len()
    }

    pub fn is_empty(&self) -> bool {
        self.uris.is_empty()
    }
}

fn read_lines(path: &Path) -> Result<Vec<String>, RequestError> {
    let text = fs::read_to_string(path).map_err(|e| {
        RequestError::Configuration(format!("reading {}: {e}", path.display()))
    })?;
    Ok(text
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(str::to_string)
        .collect())
}
