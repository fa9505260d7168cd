//! Link configuration parameters
//!
//! Tunable parameters for discovery, reply deadlines, and uploads.
//! Values can be loaded from JSON or built from [`LinkConfig::default`].

use core::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Client-side link configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LinkConfig {
    // --- Discovery ---
    /// Exact advertised name to connect to (e.g. "Frame 4F"); any named device if unset
    pub device_name: Option<String>,
    /// Scan + connect timeout (milliseconds)
    pub connect_timeout_ms: u64,

    // --- Replies ---
    /// Deadline for `await_reply` sends (milliseconds)
    pub reply_timeout_ms: u64,

    // --- Upload ---
    /// Bytes of script wrapper around each uploaded chunk
    pub upload_overhead: usize,
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            device_name: None,
            connect_timeout_ms: 10_000,
            reply_timeout_ms: 5_000,
            // len(r#"f:write("");print(nil)"#)
            upload_overhead: 22,
        }
    }
}

impl LinkConfig {
    /// Parse and validate a JSON document. Missing fields take defaults.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|_| Error::Configuration("invalid config JSON"))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.connect_timeout_ms == 0 {
            return Err(Error::Configuration("connect_timeout_ms must be > 0"));
        }
        if self.reply_timeout_ms == 0 {
            return Err(Error::Configuration("reply_timeout_ms must be > 0"));
        }
        if self.upload_overhead == 0 {
            return Err(Error::Configuration("upload_overhead must be > 0"));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }

    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}
