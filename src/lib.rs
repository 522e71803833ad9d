//! Riftgate Library
//!
//! Adaptive admission control for Riot API clients. Rate limits are learned
//! from response headers the first time a scope is used and then enforced
//! locally across every scope a call touches, before the call leaves the
//! process.
//!
//! ```no_run
//! # async fn run() -> anyhow::Result<()> {
//! use riftgate::config::Config;
//! use riftgate::endpoints::ApiCall;
//! use riftgate::governor::Governor;
//! use riftgate::routes::Region;
//! use riftgate::transport::HttpTransport;
//!
//! let config = Config::load_from_path("riftgate.toml")?;
//! riftgate::logging::init(&config.logging)?;
//!
//! let transport = HttpTransport::new(&config.transport)?;
//! let governor = Governor::new(transport, config.governor);
//!
//! let response = governor
//!     .govern(&ApiCall::account_by_puuid(Region::Europe, "puuid"))
//!     .await?;
//! println!("{}", response.text());
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod endpoints;
pub mod governor;
pub mod logging;
pub mod metrics;
pub mod routes;
pub mod testing;
pub mod transport;
