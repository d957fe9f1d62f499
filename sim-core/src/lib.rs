//! `sim-core`: a tick-driven, multi-market auction engine with
//! supply/demand price discovery, order-book matching, aggregate market
//! psychology, monetary policy feedback, and finite-resource scarcity
//! dynamics.
//!
//! The [`Kernel`] owns the world — agents, markets, commodities, monetary
//! and psychology state — and drives it forward one tick at a time via
//! [`Kernel::tick_once`]. Callers interact only through the Kernel's
//! public surface (`register_agent`, `submit_action`, `snapshot`, event
//! subscriptions); there are no shared references into live state.
//!
//! Module map:
//! - [`types`] — `Money`, generational ids, `Action`.
//! - [`config`] — `KernelConfig` and the per-component constant structs.
//! - [`error`] — the `SimError`/`ConfigError` taxonomy.
//! - [`order_book`] — sorted bid/ask ladders and cross-matching.
//! - [`pricer`] — the supply-demand equilibrium update.
//! - [`scarcity`] — commodity reserves, depletion, discovery.
//! - [`psychology`] — sentiment/fear/greed aggregation and herding.
//! - [`monetary`] — money supply, velocity, inflation, policy triggers.
//! - [`agent`] — registered participants and their pending actions.
//! - [`market`] — per-market state combining the above.
//! - [`events`] — the typed publish/subscribe event bus.
//! - [`snapshot`] — value-copy read types returned by `Kernel::snapshot`.
//! - [`kernel`] — the orchestrator tying every module into a tick pipeline.
//!
//! When the `instrument` feature is enabled (default), per-tick and
//! per-price-update metrics are emitted via `tracing` for the
//! `instrument` crate's `DataFrameSubscriber` to collect.

pub mod agent;
pub mod config;
pub mod error;
pub mod events;
pub mod kernel;
pub mod market;
pub mod monetary;
pub mod order_book;
pub mod pricer;
pub mod psychology;
pub mod scarcity;
pub mod snapshot;
pub mod types;

pub use agent::Agent;
pub use config::KernelConfig;
pub use error::{ConfigError, SimError, SimResult};
pub use kernel::Kernel;
pub use market::MarketTable;
pub use snapshot::WorldSnapshot;
pub use types::{Action, AgentId, BehaviorProfile, CommodityId, MarketId, Money};
