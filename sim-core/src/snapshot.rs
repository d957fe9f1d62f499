//! Read-side value types returned by `Kernel::snapshot` (spec §4.1, §6).
//!
//! Everything here is an owned value copy — no references into live
//! kernel state ever escape through this module.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::market::MarketTable;
use crate::monetary::MonetaryState;
use crate::psychology::PsychologyState;
use crate::scarcity::Commodity;
use crate::types::{AgentId, BehaviorProfile, CommodityId, DISPLAY_SCALE, MarketId, Money, quantize};

fn q(m: Money) -> Money {
    quantize(m, DISPLAY_SCALE)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryPointSnapshot {
    pub timestamp: u64,
    pub price: Money,
    pub volume: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketSnapshot {
    pub id: MarketId,
    pub name: String,
    pub base_price: Money,
    pub current_price: Money,
    pub fundamental_value: Money,
    pub supply: Money,
    pub demand: Money,
    pub volatility: f64,
    pub scarcity: f64,
    pub bid_depth: Money,
    pub ask_depth: Money,
    pub spread: Option<Money>,
    /// Oldest-first, per §6.
    pub price_history: Vec<HistoryPointSnapshot>,
}

impl MarketSnapshot {
    pub fn from_table(id: MarketId, table: &MarketTable) -> Self {
        Self {
            id,
            name: table.name.clone(),
            base_price: q(table.base_price),
            current_price: q(table.current_price),
            fundamental_value: q(table.fundamental_value),
            supply: q(table.supply),
            demand: q(table.demand),
            volatility: table.volatility,
            scarcity: table.scarcity,
            bid_depth: q(table.order_book.bid_depth()),
            ask_depth: q(table.order_book.ask_depth()),
            spread: table.order_book.spread().map(q),
            price_history: table
                .price_history
                .iter()
                .map(|h| HistoryPointSnapshot { timestamp: h.timestamp, price: q(h.price), volume: q(h.volume) })
                .collect(),
        }
    }
}

pub type PsychologySnapshot = PsychologyState;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetaryReadingSnapshot {
    pub timestamp: u64,
    pub supply: Money,
    pub velocity: Money,
    pub inflation: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetarySnapshot {
    pub money_supply: Money,
    pub velocity: Money,
    pub current_inflation_rate: Money,
    pub base_rate: Money,
    /// Oldest-first, per §6.
    pub history: Vec<MonetaryReadingSnapshot>,
}

impl MonetarySnapshot {
    pub fn from_state(state: &MonetaryState) -> Self {
        Self {
            money_supply: q(state.money_supply),
            velocity: q(state.velocity),
            current_inflation_rate: q(state.current_inflation_rate),
            base_rate: q(state.base_rate),
            history: state
                .history
                .iter()
                .map(|r| MonetaryReadingSnapshot {
                    timestamp: r.timestamp,
                    supply: q(r.supply),
                    velocity: q(r.velocity),
                    inflation: q(r.inflation),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScarcitySnapshot {
    pub id: CommodityId,
    pub commodity_id: String,
    pub current_reserves: Money,
    pub initial_reserves: Money,
    pub scarcity_level: f64,
    pub price_multiplier: f64,
}

impl ScarcitySnapshot {
    pub fn from_commodity(id: CommodityId, c: &Commodity) -> Self {
        Self {
            id,
            commodity_id: c.id.clone(),
            current_reserves: q(c.current_reserves),
            initial_reserves: q(c.initial_reserves),
            scarcity_level: c.scarcity_level,
            price_multiplier: c.price_multiplier,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentSnapshot {
    pub id: AgentId,
    pub wealth: Money,
    pub portfolio: HashMap<MarketId, Money>,
    pub sentiment: f64,
    pub fear: f64,
    pub greed: f64,
    pub confidence: f64,
    pub behavior_profile: BehaviorProfile,
    pub is_active: bool,
}

impl AgentSnapshot {
    pub fn from_agent(agent: &Agent) -> Self {
        Self {
            id: agent.id,
            wealth: q(agent.wealth),
            portfolio: agent.portfolio.iter().map(|(k, v)| (*k, q(*v))).collect(),
            sentiment: agent.sentiment,
            fear: agent.fear,
            greed: agent.greed,
            confidence: agent.confidence,
            behavior_profile: agent.behavior_profile,
            is_active: agent.is_active,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldSnapshot {
    pub tick: u64,
    pub timestamp: u64,
    pub markets: Vec<MarketSnapshot>,
    pub psychology: PsychologySnapshot,
    pub monetary: MonetarySnapshot,
    pub scarcity: Vec<ScarcitySnapshot>,
    pub agents: Vec<AgentSnapshot>,
    pub reject_count: u32,
    pub market_fault_count: u32,
}
