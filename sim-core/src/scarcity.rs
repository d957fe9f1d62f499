//! Scarcity Engine: commodity reserves, consumption, depletion, discovery
//! events, and the scarcity-level-to-price-multiplier mapping (spec §4.4).

use rand::Rng;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::{CommodityInit, CommodityType};
use crate::types::{Money, f64_to_money, money_to_f64};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Commodity {
    pub id: String,
    pub kind: CommodityType,
    pub initial_reserves: Money,
    pub current_reserves: Money,
    pub consumption_rate: Money,
    pub critical_threshold: Money,
    pub scarcity_level: f64,
    pub price_multiplier: f64,
    pub k: f64,
    /// Latch: true once a critical-scarcity event has fired for the
    /// current downward crossing; rearmed when reserves recover above
    /// the threshold.
    critical_armed: bool,
}

impl Commodity {
    pub fn new(init: &CommodityInit) -> Self {
        Self {
            id: init.id.clone(),
            kind: init.kind,
            initial_reserves: init.initial_reserves,
            current_reserves: init.initial_reserves,
            consumption_rate: init.consumption_rate,
            critical_threshold: init.critical_threshold,
            scarcity_level: 0.0,
            price_multiplier: 1.0,
            k: init.k,
            critical_armed: true,
        }
    }

    fn recompute(&mut self) {
        let ratio = if self.initial_reserves.is_zero() {
            0.0
        } else {
            money_to_f64(self.current_reserves / self.initial_reserves)
        };
        self.scarcity_level = (1.0 - ratio).clamp(0.0, 1.0);
        self.price_multiplier = 1.0 + self.scarcity_level * self.k;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ScarcityEvent {
    CriticalScarcity { commodity_id: String },
    Discovery { commodity_id: String, amount: Money },
}

#[derive(Default)]
pub struct ScarcityEngine;

impl ScarcityEngine {
    /// Apply one tick's consumption to `commodity`, never driving reserves
    /// below zero, and returns any events fired (the critical-scarcity
    /// latch only fires once per downward crossing).
    pub fn tick(&self, commodity: &mut Commodity) -> Vec<ScarcityEvent> {
        let mut events = Vec::new();

        commodity.current_reserves = (commodity.current_reserves - commodity.consumption_rate)
            .max(Decimal::ZERO);
        commodity.recompute();

        if commodity.current_reserves < commodity.critical_threshold {
            if commodity.critical_armed {
                events.push(ScarcityEvent::CriticalScarcity {
                    commodity_id: commodity.id.clone(),
                });
                commodity.critical_armed = false;
            }
        } else {
            commodity.critical_armed = true;
        }

        events
    }

    /// Add reserves to a commodity. With `amount: None`, adds 20-40% of
    /// initial reserves, deterministic from `rng`.
    pub fn trigger_discovery(
        &self,
        commodity: &mut Commodity,
        amount: Option<Money>,
        rng: &mut impl Rng,
    ) -> ScarcityEvent {
        let added = amount.unwrap_or_else(|| {
            let fraction = rng.random_range(0.20..=0.40);
            f64_to_money(money_to_f64(commodity.initial_reserves) * fraction)
        });
        commodity.current_reserves += added;
        commodity.recompute();
        if commodity.current_reserves >= commodity.critical_threshold {
            commodity.critical_armed = true;
        }
        ScarcityEvent::Discovery {
            commodity_id: commodity.id.clone(),
            amount: added,
        }
    }
}
