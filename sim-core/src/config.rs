//! Kernel configuration. A single value handed to `Kernel::new` — no
//! process-wide state, no global singletons (spec §9).

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::types::Money;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KernelConfig {
    pub max_agents: u32,
    /// Ticks per second. `0` disables automatic ticking; callers drive
    /// the simulation with `Kernel::tick_once`.
    pub tick_rate: u16,
    pub tick_budget_ms: u32,
    pub base_inflation_rate: Money,
    pub pricer: PricerConfig,
    pub liquidity_floor_depth: Money,
    pub liquidity_floor_spread: Money,
    pub history_capacity: u16,
    pub commodities: Vec<CommodityInit>,
    pub markets: Vec<MarketInit>,
    pub monetary: MonetaryConfig,
    pub psychology: PsychologyConfig,
    /// Actions drained per active agent per tick (spec §4.1 step 1).
    pub actions_per_tick: u32,
    /// Seed for the deterministic RNG backing discovery-event defaults
    /// and other stochastic tie-breaks.
    pub seed: u64,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            max_agents: 10_000,
            tick_rate: 10,
            tick_budget_ms: 100,
            base_inflation_rate: Decimal::ZERO,
            pricer: PricerConfig::default(),
            liquidity_floor_depth: Decimal::new(50, 0),
            liquidity_floor_spread: Decimal::new(5, 1),
            history_capacity: 1024,
            commodities: Vec::new(),
            markets: Vec::new(),
            monetary: MonetaryConfig::default(),
            psychology: PsychologyConfig::default(),
            actions_per_tick: 16,
            seed: 0,
        }
    }
}

impl KernelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_agents == 0 {
            return Err(ConfigError::ZeroMaxAgents);
        }
        if !(0.0..=1.0).contains(&self.pricer.damping_factor) {
            return Err(ConfigError::InvalidDampingFactor(self.pricer.damping_factor));
        }
        if !(0.0..=1.0).contains(&self.pricer.price_memory) {
            return Err(ConfigError::InvalidPriceMemory(self.pricer.price_memory));
        }
        if !(self.pricer.max_price_change > 0.0 && self.pricer.max_price_change <= 1.0) {
            return Err(ConfigError::InvalidMaxPriceChange(self.pricer.max_price_change));
        }
        if self.history_capacity == 0 {
            return Err(ConfigError::ZeroHistoryCapacity);
        }
        for m in &self.markets {
            if m.base_price <= Decimal::ZERO {
                return Err(ConfigError::InvalidMarketBasePrice(m.name.clone()));
            }
        }
        for c in &self.commodities {
            if c.initial_reserves <= Decimal::ZERO {
                return Err(ConfigError::InvalidCommodityReserves(c.id.clone()));
            }
        }
        Ok(())
    }
}

/// Constants for the Supply-Demand Pricer (spec §4.2).
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PricerConfig {
    pub damping_factor: f64,
    pub price_memory: f64,
    pub max_price_change: f64,
}

impl Default for PricerConfig {
    fn default() -> Self {
        Self {
            damping_factor: 0.95,
            price_memory: 0.1,
            max_price_change: 0.5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketInit {
    pub name: String,
    pub base_price: Money,
    pub supply: Money,
    pub demand: Money,
    pub elasticity: f64,
    pub supply_elasticity: f64,
    pub demand_elasticity: f64,
}

impl MarketInit {
    pub fn new(name: impl Into<String>, base_price: Money, supply: Money, demand: Money) -> Self {
        Self {
            name: name.into(),
            base_price,
            supply,
            demand,
            elasticity: 1.0,
            supply_elasticity: 1.0,
            demand_elasticity: 1.0,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CommodityType {
    Finite,
    Renewable,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommodityInit {
    pub id: String,
    pub kind: CommodityType,
    pub initial_reserves: Money,
    pub consumption_rate: Money,
    pub critical_threshold: Money,
    /// Scarcity-to-price-multiplier slope; default 4 (100% scarcity -> 5x).
    pub k: f64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonetaryConfig {
    pub alpha: f64,
    pub sustained_ticks: u32,
    pub rate_hike_threshold: f64,
    pub rate_cut_threshold: f64,
    pub qe_threshold: f64,
    pub qt_threshold: f64,
    pub inflation_floor: f64,
    pub inflation_ceiling: f64,
}

impl Default for MonetaryConfig {
    fn default() -> Self {
        Self {
            alpha: 0.8,
            sustained_ticks: 10,
            rate_hike_threshold: 0.10,
            rate_cut_threshold: -0.02,
            qe_threshold: -0.05,
            qt_threshold: 0.08,
            inflation_floor: -0.10,
            inflation_ceiling: 0.15,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PsychologyConfig {
    /// Herding weight in the volatility multiplier formula.
    pub herding_weight: f64,
    /// Fear weight in the volatility multiplier formula.
    pub fear_weight: f64,
    pub volatility_min: f64,
    pub volatility_max: f64,
    /// Decay window (ticks) for an externally-triggered psychology event.
    pub decay_ticks: u32,
}

impl Default for PsychologyConfig {
    fn default() -> Self {
        Self {
            herding_weight: 1.0,
            fear_weight: 0.6,
            volatility_min: 0.5,
            volatility_max: 3.0,
            decay_ticks: 20,
        }
    }
}
