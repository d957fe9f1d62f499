//! Monetary Engine: money supply/velocity tracking, smoothed inflation
//! update, and policy-trigger detection (spec §4.6).

use std::collections::VecDeque;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::MonetaryConfig;
use crate::types::{Money, f64_to_money, money_to_f64};

/// Aggregate per-tick economic behavior across active agents, summed.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateBehavior {
    pub spending: Money,
    pub saving: Money,
    pub investment: Money,
    pub borrowing: Money,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MonetaryReading {
    pub timestamp: u64,
    pub supply: Money,
    pub velocity: Money,
    pub inflation: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonetaryState {
    pub money_supply: Money,
    pub velocity: Money,
    pub current_inflation_rate: Money,
    pub base_rate: Money,
    pub history: VecDeque<MonetaryReading>,
    pub history_capacity: usize,
    /// Consecutive ticks the inflation rate has stayed below the QE
    /// threshold / above the QT threshold, for the "sustained N ticks"
    /// policy gates.
    below_qe_threshold_ticks: u32,
    above_qt_threshold_ticks: u32,
}

impl MonetaryState {
    pub fn new(base_inflation_rate: Money, base_rate: Money, history_capacity: usize) -> Self {
        Self {
            money_supply: Decimal::ONE,
            velocity: Decimal::ONE,
            current_inflation_rate: base_inflation_rate,
            base_rate,
            history: VecDeque::with_capacity(history_capacity),
            history_capacity,
            below_qe_threshold_ticks: 0,
            above_qt_threshold_ticks: 0,
        }
    }

    fn push_history(&mut self, reading: MonetaryReading) {
        if self.history.len() >= self.history_capacity {
            self.history.pop_front();
        }
        self.history.push_back(reading);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MonetaryEvent {
    RateHike,
    RateCut,
    QuantitativeEasing,
    QuantitativeTightening,
}

#[derive(Default)]
pub struct MonetaryEngine;

impl MonetaryEngine {
    /// Advance the monetary state by one tick given this tick's aggregate
    /// agent behavior and trade volume, returning any policy events.
    pub fn tick(
        &self,
        state: &mut MonetaryState,
        behavior: &AggregateBehavior,
        timestamp: u64,
        cfg: &MonetaryConfig,
    ) -> Vec<MonetaryEvent> {
        let prev_supply = state.money_supply;
        let prev_velocity = state.velocity;

        let saving_delta = behavior.saving;
        // Quantitative easing, if active this tick, is folded in by the
        // kernel via an explicit supply bump before calling tick(); absent
        // that, qe_delta is zero.
        state.money_supply = (state.money_supply + behavior.borrowing - saving_delta).max(Decimal::ZERO);

        state.velocity = if state.money_supply.is_zero() {
            Decimal::ZERO
        } else {
            behavior.spending / state.money_supply
        };

        let supply_growth = if prev_supply.is_zero() {
            0.0
        } else {
            money_to_f64((state.money_supply - prev_supply) / prev_supply)
        };
        let velocity_growth = if prev_velocity.is_zero() {
            0.0
        } else {
            money_to_f64((state.velocity - prev_velocity) / prev_velocity)
        };

        let pi_old = money_to_f64(state.current_inflation_rate);
        let pi_raw = cfg.alpha * pi_old + (1.0 - cfg.alpha) * (supply_growth + velocity_growth);
        let pi_new = pi_raw.clamp(cfg.inflation_floor, cfg.inflation_ceiling);
        state.current_inflation_rate = f64_to_money(pi_new);

        state.push_history(MonetaryReading {
            timestamp,
            supply: state.money_supply,
            velocity: state.velocity,
            inflation: state.current_inflation_rate,
        });

        let mut events = Vec::new();
        if pi_new > cfg.rate_hike_threshold {
            events.push(MonetaryEvent::RateHike);
        }
        if pi_new < cfg.rate_cut_threshold {
            events.push(MonetaryEvent::RateCut);
        }

        if pi_new < cfg.qe_threshold {
            state.below_qe_threshold_ticks += 1;
        } else {
            state.below_qe_threshold_ticks = 0;
        }
        if state.below_qe_threshold_ticks >= cfg.sustained_ticks {
            events.push(MonetaryEvent::QuantitativeEasing);
        }

        if pi_new > cfg.qt_threshold {
            state.above_qt_threshold_ticks += 1;
        } else {
            state.above_qt_threshold_ticks = 0;
        }
        if state.above_qt_threshold_ticks >= cfg.sustained_ticks {
            events.push(MonetaryEvent::QuantitativeTightening);
        }

        events
    }
}
