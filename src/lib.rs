//! # pmu-rs
//!
//! Request orchestration for PMU horse-racing data: the public programme
//! provider (reunions, races, runners) and a private betting-analytics
//! backend (value bets, tiercé/quinté combinations, daily picks, manual bets).
//!
//! ## Quick Start
//!
//! ```no_run
//! use pmu_rs::{Config, Family, PmuClient, Stores};
//! use rust_decimal::Decimal;
//! use std::sync::Arc;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = Config::new()?.with_env_overrides()?;
//! let stores = Arc::new(Stores::new());
//! let client = PmuClient::new(&config, stores.clone())?;
//!
//! // Today's programme from the provider
//! let programme = client.load_programme(None).await?;
//! println!("{} reunions", programme.get("programme")["reunions"].as_array().map_or(0, |r| r.len()));
//!
//! // Value bets from the backend; every consumer of the family sees the result
//! client.fetch_value_bets(42, Decimal::from(1000)).await?;
//! let state = stores.get(Family::ValueBets).state();
//! assert!(!state.loading);
//! # Ok(())
//! # }
//! ```
//!
//! ## Pieces
//!
//! - **Routing**: ordered prefix table mapping `/api/pmu/...` onto the
//!   provider or backend origin, with path rewriting
//! - **Executor**: one HTTP call under a self-disarming deadline
//! - **Normalizer**: schema-driven defaults so every field is always present
//! - **Store**: per-family shared state with stale-completion protection
//! - **Dates**: compact `DDMMYYYY` <-> ISO `YYYY-MM-DD`
//!
//! ## Configuration
//!
//! ```toml
//! [upstreams]
//! provider_url = "https://offline.turfinfo.api.pmu.fr"
//! provider_version = 7
//! backend_url = "http://localhost:8000"
//!
//! [timeouts]
//! default_ms = 10000
//! combinations_ms = 20000
//! ```

pub mod client;
pub mod config;
pub mod dates;
pub mod error;
pub mod executor;
pub mod models;
pub mod normalizer;
pub mod request;
pub mod retry;
pub mod routing;
pub mod schemas;
pub mod store;
pub mod validation;

// Re-export commonly used types at the crate root
pub use client::PmuClient;
pub use config::Config;
pub use error::ExecError;
pub use executor::{HttpCall, RawBody, RequestExecutor};
pub use models::CombinationType;
pub use normalizer::{normalize, normalize_text, Envelope, Schema, Shape};
pub use request::{Method, RequestDescriptor};
pub use routing::{Gateway, Route, RoutingTable, Upstream, UpstreamTarget};
pub use store::{Family, FamilyStore, InFlight, QueryState, Stores, Ticket};
