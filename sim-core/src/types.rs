//! Core value types shared across the simulation: money, ids, and the
//! tagged-sum types the kernel moves between modules.
//!
//! IDs use `slotmap`'s generational keys so that a freed agent or market
//! slot can be reused without an old handle silently aliasing new state.

use rust_decimal::Decimal;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use serde::{Deserialize, Serialize};
use slotmap::new_key_type;

new_key_type! {
    pub struct AgentId;
    pub struct MarketId;
    pub struct CommodityId;
}

/// Arbitrary-scale fixed-point value used for every price, quantity, and
/// money-supply figure in the simulation. Never mix with `f64` except at
/// the explicitly-marked statistical boundaries (variance, herding,
/// volatility, elasticity exponents).
pub type Money = Decimal;

/// Convert a `Money` value to `f64` for use in a statistical computation.
/// Panics only if the value cannot be represented at all, which does not
/// happen for any value produced by this crate (bounded by config).
pub fn money_to_f64(m: Money) -> f64 {
    m.to_f64().unwrap_or(0.0)
}

pub fn f64_to_money(v: f64) -> Money {
    Decimal::from_f64(v).unwrap_or(Decimal::ZERO)
}

/// Round-half-even quantization at `scale` fractional digits, used when
/// rendering a `Money` value for display or snapshot serialization.
pub fn quantize(m: Money, scale: u32) -> Money {
    m.round_dp_with_strategy(scale, rust_decimal::RoundingStrategy::MidpointNearestEven)
}

/// Fractional digits `WorldSnapshot` quantizes `Money` fields to. Full
/// precision is kept in live kernel state; this only applies at the
/// display/serialization boundary.
pub const DISPLAY_SCALE: u32 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Side {
    Buy,
    Sell,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Limit,
    Market,
    SyntheticMm,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BehaviorProfile {
    Conservative,
    Balanced,
    Aggressive,
}

/// An intent submitted by an external agent. Translated into an `Order`
/// (or a cancellation) during the kernel's action-intake step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Action {
    Buy {
        market: MarketId,
        quantity: Money,
        price_limit: Option<Money>,
    },
    Sell {
        market: MarketId,
        quantity: Money,
        price_limit: Option<Money>,
    },
    Cancel {
        market: MarketId,
        order_id: u64,
    },
    Hold,
}

impl Action {
    pub fn market(&self) -> Option<MarketId> {
        match self {
            Action::Buy { market, .. } | Action::Sell { market, .. } | Action::Cancel { market, .. } => {
                Some(*market)
            }
            Action::Hold => None,
        }
    }
}
