//! Supply-Demand Pricer: equilibrium price update with elasticity,
//! damping, memory, and a max-change clamp (spec §4.2).
//!
//! All arithmetic here is `Decimal` except the elasticity exponent in
//! `supply_at`/`demand_at`, which is inherently a `powf` and is the kind
//! of statistical boundary spec.md §9 calls out as float-acceptable.

use rust_decimal::Decimal;

use crate::config::PricerConfig;
use crate::types::{Money, f64_to_money, money_to_f64};

#[derive(Debug, Clone, Copy)]
pub struct PricerInputs {
    pub supply: Money,
    pub demand: Money,
    pub current_price: Money,
    pub elasticity: f64,
}

#[derive(Debug, Clone, Copy)]
pub struct PricerOutput {
    pub new_price: Money,
    pub ratio: Money,
    pub damped_adjustment: f64,
    pub elasticity: f64,
}

/// Reprice a single market. Idempotent at equilibrium (`supply == demand`
/// implies `new_price == current_price`); monotone in demand, inversely
/// monotone in supply; the price never moves by more than
/// `current_price * max_price_change` in one call.
pub fn reprice(inputs: &PricerInputs, cfg: &PricerConfig) -> PricerOutput {
    let current = inputs.current_price;
    let max_change = f64_to_money(cfg.max_price_change);

    let ratio = if inputs.supply.is_zero() {
        Decimal::ONE + max_change
    } else {
        inputs.demand / inputs.supply
    };

    let raw_adjustment = money_to_f64(ratio - Decimal::ONE) * inputs.elasticity;
    let damped_adjustment = raw_adjustment * cfg.damping_factor;

    let target_price = current * (Decimal::ONE + f64_to_money(damped_adjustment));

    let mut delta = target_price - current;
    let clamp = current * max_change;
    if delta.abs() > clamp {
        delta = if delta.is_sign_negative() { -clamp } else { clamp };
    }

    let memory = f64_to_money(cfg.price_memory);
    let new_price = current * memory + (current + delta) * (Decimal::ONE - memory);

    PricerOutput {
        new_price,
        ratio,
        damped_adjustment,
        elasticity: inputs.elasticity,
    }
}

/// Supply-at-price curve: `base_supply * (p / base_price) ^ supply_elasticity`.
pub fn supply_at(base_supply: Money, base_price: Money, price: Money, supply_elasticity: f64) -> Money {
    if base_price.is_zero() || price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let ratio = money_to_f64(price / base_price);
    f64_to_money(money_to_f64(base_supply) * ratio.powf(supply_elasticity))
}

/// Demand-at-price curve: `base_demand * (base_price / p) ^ demand_elasticity`.
pub fn demand_at(base_demand: Money, base_price: Money, price: Money, demand_elasticity: f64) -> Money {
    if price.is_zero() {
        return Decimal::MAX;
    }
    let ratio = money_to_f64(base_price / price);
    f64_to_money(money_to_f64(base_demand) * ratio.powf(demand_elasticity))
}

/// Clearing quantity at `price`: the smaller of supply-at-price and
/// demand-at-price.
pub fn clearing_quantity(
    base_supply: Money,
    base_demand: Money,
    base_price: Money,
    price: Money,
    supply_elasticity: f64,
    demand_elasticity: f64,
) -> Money {
    let s = supply_at(base_supply, base_price, price, supply_elasticity);
    let d = demand_at(base_demand, base_price, price, demand_elasticity);
    s.min(d)
}

/// Kyle-lambda style price-impact estimate for a prospective order of
/// size `s` (spec §4.3). Advisory only — the matcher never splits orders
/// on its own account.
pub fn price_impact(volatility: f64, market_depth: Money, order_size: Money) -> f64 {
    let depth = money_to_f64(market_depth).max(1e-9);
    (volatility / depth.sqrt()) * money_to_f64(order_size)
}
