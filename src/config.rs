//! Tree Configuration
//!
//! Paging and timeout settings, persisted as JSON.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Page size used when the source system does not say otherwise
pub const DEFAULT_PAGE_SIZE: usize = 20;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeConfig {
    /// Children fetched per expand / load-more call
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Root-level items fetched per initial load / load-more-roots call
    #[serde(default = "default_page_size")]
    pub root_page_size: usize,
    /// Per-fetch timeout; None waits indefinitely
    #[serde(default)]
    pub fetch_timeout_ms: Option<u64>,
    /// Columns of indentation per hierarchy level
    #[serde(default = "default_indent_width")]
    pub indent_width: usize,
}

fn default_page_size() -> usize {
    DEFAULT_PAGE_SIZE
}

fn default_indent_width() -> usize {
    2
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            root_page_size: default_page_size(),
            fetch_timeout_ms: None,
            indent_width: default_indent_width(),
        }
    }
}

impl TreeConfig {
    /// Load from a JSON file, falling back to defaults when missing or invalid
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => match serde_json::from_str::<TreeConfig>(&content) {
                Ok(config) => config.validated(),
                Err(e) => {
                    log::warn!("Invalid tree config {}: {}", path.display(), e);
                    Self::default()
                }
            },
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self, path: &Path) -> Result<(), String> {
        let content = serde_json::to_string_pretty(self)
            .map_err(|e| format!("Failed to serialize config: {}", e))?;
        std::fs::write(path, content).map_err(|e| format!("Failed to write config: {}", e))
    }

    /// Page sizes of zero would never make progress
    pub fn validated(mut self) -> Self {
        self.page_size = self.page_size.max(1);
        self.root_page_size = self.root_page_size.max(1);
        self
    }

    pub fn fetch_timeout(&self) -> Option<Duration> {
        self.fetch_timeout_ms.map(Duration::from_millis)
    }
}
