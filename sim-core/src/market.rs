//! Market Table: per-market state — price, supply/demand, order book, and
//! price/volume history (spec §3).

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::order_book::OrderBook;
use crate::types::Money;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct HistoryPoint {
    pub timestamp: u64,
    pub price: Money,
    pub volume: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketTable {
    pub name: String,
    /// Immutable after creation.
    pub base_price: Money,
    pub current_price: Money,
    pub fundamental_value: Money,
    /// Baseline supply/demand from configuration; `supply`/`demand` below
    /// are recomputed from these plus each tick's order flow.
    pub base_supply: Money,
    pub base_demand: Money,
    pub supply: Money,
    pub demand: Money,
    pub volatility: f64,
    pub scarcity: f64,
    pub order_book: OrderBook,
    pub price_history: VecDeque<HistoryPoint>,
    pub history_capacity: usize,
    pub elasticity: f64,
    pub supply_elasticity: f64,
    pub demand_elasticity: f64,
}

impl MarketTable {
    pub fn new(name: impl Into<String>, base_price: Money, supply: Money, demand: Money, history_capacity: usize) -> Self {
        Self {
            name: name.into(),
            base_price,
            current_price: base_price,
            fundamental_value: base_price,
            base_supply: supply.max(Decimal::ZERO),
            base_demand: demand.max(Decimal::ZERO),
            supply: supply.max(Decimal::ZERO),
            demand: demand.max(Decimal::ZERO),
            volatility: 0.0,
            scarcity: 0.0,
            order_book: OrderBook::default(),
            price_history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            elasticity: 1.0,
            supply_elasticity: 1.0,
            demand_elasticity: 1.0,
        }
    }

    pub fn set_supply(&mut self, supply: Money) {
        self.supply = supply.max(Decimal::ZERO);
    }

    pub fn set_demand(&mut self, demand: Money) {
        self.demand = demand.max(Decimal::ZERO);
    }

    pub fn push_history(&mut self, timestamp: u64, price: Money, volume: Money) {
        if self.price_history.len() >= self.history_capacity {
            self.price_history.pop_front();
        }
        self.price_history.push_back(HistoryPoint { timestamp, price, volume });
    }

    /// Debug-only structural invariant check (spec §3): never panics in
    /// release, used by tests and `debug_assert!` call sites.
    pub fn invariants_hold(&self) -> bool {
        if self.supply < Decimal::ZERO || self.demand < Decimal::ZERO || self.current_price <= Decimal::ZERO {
            return false;
        }
        for w in self.order_book.bids.windows(2) {
            if w[0].price.unwrap_or(Decimal::MAX) < w[1].price.unwrap_or(Decimal::MAX) {
                return false;
            }
        }
        for w in self.order_book.asks.windows(2) {
            if w[0].price.unwrap_or(Decimal::ZERO) > w[1].price.unwrap_or(Decimal::ZERO) {
                return false;
            }
        }
        true
    }
}
