//! Quota Descriptors and Disclosure Parsing
//!
//! Quotas are learned from response headers of the form `count:windowSeconds`.
//! The app header lists one pair per enforced window (`100:120,20:1`), the
//! method header carries a single pair (`50:10`).

use reqwest::header::HeaderMap;
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use std::time::Duration;

use super::config::GovernorConfig;
use super::scope::QuotaSource;

/// Longest window accepted from a disclosure, one day
pub const MAX_WINDOW_SECS: u64 = 86_400;

/// Known quota of one scope: `capacity` hits per `window`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QuotaDescriptor {
    capacity: u32,
    window_secs: u64,
}

impl QuotaDescriptor {
    /// Returns `None` unless both capacity and window are positive and the
    /// window is at most [`MAX_WINDOW_SECS`]
    pub fn new(capacity: u32, window_secs: u64) -> Option<Self> {
        (capacity > 0 && window_secs > 0 && window_secs <= MAX_WINDOW_SECS).then_some(Self {
            capacity,
            window_secs,
        })
    }

    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    pub fn window_secs(&self) -> u64 {
        self.window_secs
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_secs.min(MAX_WINDOW_SECS))
    }
}

/// Reasons a disclosure could not be turned into a descriptor
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaParseError {
    #[error("missing quota header {0}")]
    MissingHeader(String),

    #[error("quota header {header} has no entry at index {index}")]
    MissingEntry { header: String, index: usize },

    #[error("malformed quota pair '{0}'")]
    Malformed(String),

    #[error("quota pair '{0}' has a zero-second window")]
    ZeroWindow(String),

    #[error("quota pair '{0}' has a window longer than {max}s", max = MAX_WINDOW_SECS)]
    WindowTooLarge(String),

    #[error("disclosed count {count} leaves no capacity after headroom {headroom}")]
    NoCapacity { count: u32, headroom: u32 },
}

/// One `count:windowSeconds` pair as disclosed by the remote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DisclosedLimit {
    pub count: u32,
    pub window_secs: u64,
}

impl FromStr for DisclosedLimit {
    type Err = QuotaParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let pair = s.trim();
        let malformed = || QuotaParseError::Malformed(pair.to_string());

        let (count, window) = pair.split_once(':').ok_or_else(malformed)?;
        let count = count.trim().parse::<u32>().map_err(|_| malformed())?;
        let window_secs = window.trim().parse::<u64>().map_err(|_| malformed())?;

        if window_secs == 0 {
            return Err(QuotaParseError::ZeroWindow(pair.to_string()));
        }
        if window_secs > MAX_WINDOW_SECS {
            return Err(QuotaParseError::WindowTooLarge(pair.to_string()));
        }

        Ok(Self { count, window_secs })
    }
}

impl DisclosedLimit {
    /// Reserve `headroom` units of the disclosed count
    pub fn into_descriptor(self, headroom: u32) -> Result<QuotaDescriptor, QuotaParseError> {
        let capacity = self.count.saturating_sub(headroom);
        QuotaDescriptor::new(capacity, self.window_secs).ok_or(QuotaParseError::NoCapacity {
            count: self.count,
            headroom,
        })
    }
}

/// Parse a comma-separated list of pairs
pub fn parse_limit_list(value: &str) -> Result<Vec<DisclosedLimit>, QuotaParseError> {
    value.split(',').map(str::parse).collect()
}

/// Reads quota disclosures from response headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeaderConventions {
    app_header: String,
    method_header: String,
    headroom: u32,
}

impl HeaderConventions {
    pub fn new(app_header: impl Into<String>, method_header: impl Into<String>, headroom: u32) -> Self {
        Self {
            app_header: app_header.into(),
            method_header: method_header.into(),
            headroom,
        }
    }

    pub fn from_config(config: &GovernorConfig) -> Self {
        Self::new(
            config.app_rate_limit_header.clone(),
            config.method_rate_limit_header.clone(),
            config.headroom,
        )
    }

    pub fn headroom(&self) -> u32 {
        self.headroom
    }

    /// Descriptor for a scope learned from `headers`
    pub fn descriptor_for(
        &self,
        source: QuotaSource,
        headers: &HeaderMap,
    ) -> Result<QuotaDescriptor, QuotaParseError> {
        let limit = match source {
            QuotaSource::App { index } => {
                let value = header_text(headers, &self.app_header)?;
                let limits = parse_limit_list(value)?;
                limits
                    .get(index)
                    .copied()
                    .ok_or_else(|| QuotaParseError::MissingEntry {
                        header: self.app_header.clone(),
                        index,
                    })?
            }
            QuotaSource::Method => header_text(headers, &self.method_header)?.parse()?,
        };

        limit.into_descriptor(self.headroom)
    }
}

fn header_text<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, QuotaParseError> {
    let value = headers
        .get(name)
        .ok_or_else(|| QuotaParseError::MissingHeader(name.to_string()))?;
    value
        .to_str()
        .map_err(|_| QuotaParseError::Malformed(String::from_utf8_lossy(value.as_bytes()).into_owned()))
}
