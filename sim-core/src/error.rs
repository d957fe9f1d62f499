//! Error taxonomy.
//!
//! Only `Validation`/`Capacity`-shaped failures and the `Fatal`
//! configuration failure are ever returned to a caller; `Arithmetic` and
//! observer-lag failures are surfaced exclusively as events on the event
//! bus (see `events.rs`) and never interrupt the tick pipeline.

use thiserror::Error;

pub type SimResult<T> = Result<T, SimError>;

#[derive(Debug, Error)]
pub enum SimError {
    #[error("agent registry is full (capacity {capacity})")]
    CapacityExceeded { capacity: u32 },

    #[error("unknown market {0:?}")]
    UnknownMarket(crate::types::MarketId),

    #[error("unknown agent {0:?}")]
    UnknownAgent(crate::types::AgentId),

    #[error("unknown commodity {0:?}")]
    UnknownCommodity(crate::types::CommodityId),

    #[error("invalid configuration: {0}")]
    Fatal(#[from] ConfigError),

    #[error("tick budget of {budget_ms}ms exceeded after {elapsed_ms}ms")]
    TickOverrun { budget_ms: u32, elapsed_ms: u64 },
}

/// Configuration errors surfaced at `Kernel::start`. A kernel refuses to
/// start rather than run with an invalid configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("maxAgents must be greater than zero")]
    ZeroMaxAgents,

    #[error("dampingFactor must be in [0, 1], got {0}")]
    InvalidDampingFactor(f64),

    #[error("priceMemory must be in [0, 1], got {0}")]
    InvalidPriceMemory(f64),

    #[error("maxPriceChange must be in (0, 1], got {0}")]
    InvalidMaxPriceChange(f64),

    #[error("market '{0}' has non-positive base price")]
    InvalidMarketBasePrice(String),

    #[error("historyCapacity must be greater than zero")]
    ZeroHistoryCapacity,

    #[error("commodity '{0}' has non-positive initial reserves")]
    InvalidCommodityReserves(String),
}
