//! Governor Configuration
//!
//! Header conventions and safety margins used when learning quotas.

use anyhow::Result;
use serde::{Deserialize, Serialize};

/// Units reserved from every disclosed capacity
pub const DEFAULT_HEADROOM: u32 = 1;

/// Header carrying the routing-target-wide limits (`count:secs,count:secs`)
pub const DEFAULT_APP_RATE_LIMIT_HEADER: &str = "X-App-Rate-Limit";

/// Header carrying the single per-operation limit (`count:secs`)
pub const DEFAULT_METHOD_RATE_LIMIT_HEADER: &str = "X-Method-Rate-Limit";

/// Scope names for the entries of the app header, in header order
pub const DEFAULT_APP_WINDOWS: [&str; 2] = ["route_long", "route_short"];

/// Governor configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GovernorConfig {
    /// Enable admission control. When disabled every call goes straight to the transport.
    pub enabled: bool,

    /// Units subtracted from each disclosed count to absorb clock skew with the remote enforcer
    pub headroom: u32,

    /// Name of the routing-target-wide limit header
    pub app_rate_limit_header: String,

    /// Name of the per-operation limit header
    pub method_rate_limit_header: String,

    /// One scope name per entry of the app header
    pub app_windows: Vec<String>,
}

impl Default for GovernorConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            headroom: DEFAULT_HEADROOM,
            app_rate_limit_header: DEFAULT_APP_RATE_LIMIT_HEADER.to_string(),
            method_rate_limit_header: DEFAULT_METHOD_RATE_LIMIT_HEADER.to_string(),
            app_windows: DEFAULT_APP_WINDOWS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl GovernorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Disable admission control (for testing)
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            ..Self::default()
        }
    }

    pub fn with_headroom(mut self, headroom: u32) -> Self {
        self.headroom = headroom;
        self
    }

    pub fn with_app_windows<I, S>(mut self, windows: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.app_windows = windows.into_iter().map(Into::into).collect();
        self
    }

    /// Validate the configuration
    ///
    /// # Errors
    ///
    /// Returns an error for empty header names, an empty or duplicated window list.
    pub fn validate(&self) -> Result<()> {
        if self.app_rate_limit_header.trim().is_empty() {
            anyhow::bail!("App rate limit header name must not be empty");
        }
        if self.method_rate_limit_header.trim().is_empty() {
            anyhow::bail!("Method rate limit header name must not be empty");
        }
        if self.app_windows.is_empty() {
            anyhow::bail!("At least one app window must be configured");
        }
        for (i, window) in self.app_windows.iter().enumerate() {
            if window.trim().is_empty() {
                anyhow::bail!("App window {} has an empty name", i);
            }
            if self.app_windows[..i].contains(window) {
                anyhow::bail!("App window '{}' is listed twice", window);
            }
        }
        Ok(())
    }
}
