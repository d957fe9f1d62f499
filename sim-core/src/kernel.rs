//! Simulation Kernel: owns the world and drives the per-tick pipeline
//! (spec §4.1, §5, §6, §7). Single-threaded cooperative tick is the
//! baseline; the optional `parallel` feature shards steps 2 and 4 across
//! markets with no cross-market dependency, as §5 allows.

use std::collections::HashMap;
use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rust_decimal::Decimal;
use slotmap::SlotMap;

use crate::agent::Agent;
use crate::config::{KernelConfig, MarketInit};
use crate::error::{SimError, SimResult};
use crate::events::{EventBus, MarketFault, PriceUpdate, TickOverrun, TickSummary};
use crate::market::MarketTable;
use crate::monetary::{AggregateBehavior, MonetaryEngine, MonetaryState};
use crate::order_book::{Order, Trade};
use crate::pricer::{self, PricerInputs};
use crate::psychology::{self, DecayState, PsychologyState};
use crate::scarcity::{Commodity, ScarcityEngine};
use crate::snapshot::{AgentSnapshot, MarketSnapshot, MonetarySnapshot, ScarcitySnapshot, WorldSnapshot};
use crate::types::{Action, AgentId, BehaviorProfile, CommodityId, MarketId, Money, OrderKind, Side};

enum Intent {
    Place(Order),
    Cancel { agent_id: AgentId, order_id: u64 },
}

pub struct Kernel {
    config: KernelConfig,
    agents: SlotMap<AgentId, Agent>,
    markets: SlotMap<MarketId, MarketTable>,
    commodities: SlotMap<CommodityId, Commodity>,
    monetary: MonetaryState,
    psychology: PsychologyState,
    psychology_decay: DecayState,
    scarcity_engine: ScarcityEngine,
    monetary_engine: MonetaryEngine,
    events: EventBus,
    rng: ChaCha8Rng,
    next_order_id: u64,
    tick_count: u64,
    running: bool,
    market_maker: AgentId,
    last_reject_count: u32,
    last_market_fault_count: u32,
}

impl Kernel {
    /// Build a kernel from `config`. Does not validate — validation and
    /// the transition to running state happen in `start()`, per §7's
    /// "Fatal: configuration invalid at start()".
    pub fn new(config: KernelConfig) -> Self {
        let mut agents: SlotMap<AgentId, Agent> = SlotMap::with_key();
        let market_maker_id = agents.insert(Agent::new(AgentId::default(), BehaviorProfile::Balanced));
        {
            let mm = &mut agents[market_maker_id];
            mm.id = market_maker_id;
            mm.is_market_maker = true;
            mm.wealth = Decimal::MAX / Decimal::from(2u32);
        }

        let mut markets: SlotMap<MarketId, MarketTable> = SlotMap::with_key();
        for m in &config.markets {
            markets.insert(Self::build_market(m, config.history_capacity as usize));
        }

        let mut commodities: SlotMap<CommodityId, Commodity> = SlotMap::with_key();
        for c in &config.commodities {
            commodities.insert(Commodity::new(c));
        }

        let monetary = MonetaryState::new(config.base_inflation_rate, Decimal::ZERO, config.history_capacity as usize);

        Self {
            rng: ChaCha8Rng::seed_from_u64(config.seed),
            config,
            agents,
            markets,
            commodities,
            monetary,
            psychology: PsychologyState::default(),
            psychology_decay: DecayState::default(),
            scarcity_engine: ScarcityEngine::default(),
            monetary_engine: MonetaryEngine::default(),
            events: EventBus::new(crate::events::DEFAULT_CHANNEL_CAPACITY),
            next_order_id: 0,
            tick_count: 0,
            running: false,
            market_maker: market_maker_id,
            last_reject_count: 0,
            last_market_fault_count: 0,
        }
    }

    fn build_market(init: &MarketInit, history_capacity: usize) -> MarketTable {
        let mut table = MarketTable::new(init.name.clone(), init.base_price, init.supply, init.demand, history_capacity);
        table.elasticity = init.elasticity;
        table.supply_elasticity = init.supply_elasticity;
        table.demand_elasticity = init.demand_elasticity;
        table
    }

    /// Validate configuration and transition to running. Refuses to start
    /// with an invalid configuration (§7 Fatal).
    pub fn start(&mut self) -> SimResult<()> {
        self.config.validate().map_err(SimError::Fatal)?;
        self.running = true;
        Ok(())
    }

    /// Signal the tick loop to stop. Actions submitted after this point
    /// are rejected.
    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn tick_count(&self) -> u64 {
        self.tick_count
    }

    // --- Registry ----------------------------------------------------

    pub fn register_agent(&mut self, profile: BehaviorProfile) -> SimResult<AgentId> {
        // One slot is reserved internally for the market-maker agent.
        let active_capacity = self.agents.len().saturating_sub(1) as u32;
        if active_capacity >= self.config.max_agents {
            return Err(SimError::CapacityExceeded { capacity: self.config.max_agents });
        }
        let id = self.agents.insert(Agent::new(AgentId::default(), profile));
        self.agents[id].id = id;
        Ok(id)
    }

    pub fn unregister_agent(&mut self, id: AgentId) -> SimResult<()> {
        if !self.agents.contains_key(id) {
            return Err(SimError::UnknownAgent(id));
        }
        self.agents.remove(id);
        for market in self.markets.values_mut() {
            market.order_book.bids.retain(|o| o.agent_id != id);
            market.order_book.asks.retain(|o| o.agent_id != id);
        }
        Ok(())
    }

    pub fn register_market(&mut self, init: MarketInit) -> MarketId {
        let table = Self::build_market(&init, self.config.history_capacity as usize);
        self.markets.insert(table)
    }

    /// Submit an action on behalf of `agent_id`. Returns whether it was
    /// accepted into the agent's pending queue; this is only intake-level
    /// validation (agent/market existence, kernel running) — affordability
    /// and other settlement-time checks happen during `tick_once`.
    pub fn submit_action(&mut self, agent_id: AgentId, action: Action) -> bool {
        if !self.running {
            return false;
        }
        let Some(agent) = self.agents.get_mut(agent_id) else { return false };
        if !agent.is_active || agent.is_market_maker {
            return false;
        }
        if let Some(market) = action.market() {
            if !self.markets.contains_key(market) {
                return false;
            }
        }
        if let Action::Buy { quantity, .. } | Action::Sell { quantity, .. } = &action {
            if *quantity <= Decimal::ZERO {
                return false;
            }
        }
        agent.enqueue(action);
        true
    }

    // --- External triggers ---------------------------------------------

    pub fn trigger_discovery(&mut self, commodity_id: &str, amount: Option<Money>) -> SimResult<()> {
        let cid = self
            .commodities
            .iter()
            .find(|(_, c)| c.id == commodity_id)
            .map(|(id, _)| id)
            .ok_or_else(|| SimError::UnknownCommodity(CommodityId::default()))?;
        let commodity = &mut self.commodities[cid];
        let event = self.scarcity_engine.trigger_discovery(commodity, amount, &mut self.rng);
        self.events.publish_scarcity(self.tick_count, self.tick_count, event);
        Ok(())
    }

    pub fn trigger_psychology_shock(&mut self, intensity: f64) {
        psychology::trigger_shock(&mut self.psychology_decay, intensity, &self.config.psychology);
    }

    // --- Snapshot ---------------------------------------------------------

    pub fn snapshot(&self) -> WorldSnapshot {
        WorldSnapshot {
            tick: self.tick_count,
            timestamp: self.tick_count,
            markets: self.markets.iter().map(|(id, m)| MarketSnapshot::from_table(id, m)).collect(),
            psychology: self.psychology,
            monetary: MonetarySnapshot::from_state(&self.monetary),
            scarcity: self.commodities.iter().map(|(id, c)| ScarcitySnapshot::from_commodity(id, c)).collect(),
            agents: self
                .agents
                .iter()
                .filter(|(_, a)| !a.is_market_maker)
                .map(|(_, a)| AgentSnapshot::from_agent(a))
                .collect(),
            reject_count: self.last_reject_count,
            market_fault_count: self.last_market_fault_count,
        }
    }

    pub fn subscribe_tick(&self) -> crate::events::TickReceiver {
        self.events.subscribe_tick()
    }
    pub fn subscribe_trade(&self) -> crate::events::TradeReceiver {
        self.events.subscribe_trade()
    }
    pub fn subscribe_price(&self) -> crate::events::PriceReceiver {
        self.events.subscribe_price()
    }
    pub fn subscribe_psychology(&self) -> crate::events::PsychologyReceiver {
        self.events.subscribe_psychology()
    }
    pub fn subscribe_monetary(&self) -> crate::events::MonetaryReceiver {
        self.events.subscribe_monetary()
    }
    pub fn subscribe_scarcity(&self) -> crate::events::ScarcityReceiver {
        self.events.subscribe_scarcity()
    }
    pub fn subscribe_fault(&self) -> crate::events::FaultReceiver {
        self.events.subscribe_fault()
    }
    pub fn subscribe_overrun(&self) -> crate::events::OverrunReceiver {
        self.events.subscribe_overrun()
    }

    // --- Tick pipeline -----------------------------------------------------

    /// Advance the simulation by one tick (spec §4.1). Always available
    /// regardless of `config.tick_rate`; an automatic tick-rate loop, if
    /// any, is only a convenience driver wrapped around this.
    pub fn tick_once(&mut self) -> SimResult<()> {
        let started = Instant::now();
        let budget = Duration::from_millis(self.config.tick_budget_ms as u64);
        self.tick_count += 1;
        let tick = self.tick_count;
        let timestamp = tick;

        let mut reject_count: u32 = 0;
        let mut market_fault_count: u32 = 0;
        let mut trade_count: u32 = 0;

        // Step 1: drain actions, convert to book intents.
        let agent_ids: Vec<AgentId> =
            self.agents.iter().filter(|(_, a)| a.is_active && !a.is_market_maker).map(|(id, _)| id).collect();
        let mut orders_by_market: HashMap<MarketId, Vec<Intent>> = HashMap::new();
        // This tick's submitted buy/sell quantity per market, (buy, sell),
        // feeding the pricer's supply/demand inputs alongside the
        // configured baseline.
        let mut flow: HashMap<MarketId, (Money, Money)> = HashMap::new();
        for aid in agent_ids {
            let actions = self.agents[aid].drain_actions(self.config.actions_per_tick);
            for action in actions {
                match self.convert_action(aid, action, timestamp) {
                    Ok(Some((market, intent))) => {
                        if let Intent::Place(order) = &intent {
                            let entry = flow.entry(market).or_insert((Decimal::ZERO, Decimal::ZERO));
                            match order.side {
                                Side::Buy => entry.0 += order.quantity,
                                Side::Sell => entry.1 += order.quantity,
                            }
                        }
                        orders_by_market.entry(market).or_default().push(intent);
                    }
                    Ok(None) => {}
                    Err(()) => reject_count += 1,
                }
            }
        }

        if started.elapsed() > budget {
            return self.finish_overrun(started, reject_count, market_fault_count, trade_count);
        }

        // Step 2: match, per market, with fault isolation. Each market's
        // book is untouched by any other market's matching, so the
        // `parallel` feature shards this loop across markets with rayon;
        // the sequential form below is the default.
        let market_ids: Vec<MarketId> = self.markets.keys().collect();

        #[cfg(feature = "parallel")]
        {
            use rayon::prelude::*;

            let shards: Vec<(MarketId, MarketTable, Vec<Intent>)> = market_ids
                .iter()
                .map(|mid| (*mid, self.markets[*mid].clone(), orders_by_market.remove(mid).unwrap_or_default()))
                .collect();

            let results: Vec<(MarketId, MarketTable, Option<Vec<Trade>>, u32)> = shards
                .into_par_iter()
                .map(|(mid, mut table, intents)| {
                    let mut local_rejects = 0u32;
                    for intent in intents {
                        match intent {
                            Intent::Place(order) => table.order_book.insert(order),
                            Intent::Cancel { agent_id, order_id } => {
                                let owned = table
                                    .order_book
                                    .bids
                                    .iter()
                                    .chain(table.order_book.asks.iter())
                                    .any(|o| o.id == order_id && o.agent_id == agent_id);
                                if owned {
                                    table.order_book.cancel(order_id);
                                } else {
                                    local_rejects += 1;
                                }
                            }
                        }
                    }
                    let before = table.clone();
                    let outcome = panic::catch_unwind(AssertUnwindSafe(move || {
                        let mut t = table;
                        let trades = t.order_book.match_all(mid, timestamp);
                        (t, trades)
                    }));
                    match outcome {
                        Ok((t, trades)) => (mid, t, Some(trades), local_rejects),
                        Err(_) => (mid, before, None, local_rejects),
                    }
                })
                .collect();

            for (mid, table, outcome, local_rejects) in results {
                reject_count += local_rejects;
                if let Some(slot) = self.markets.get_mut(mid) {
                    *slot = table;
                }
                match outcome {
                    Some(trades) => {
                        for trade in &trades {
                            if self.settle_trade(trade) {
                                trade_count += 1;
                                self.events.publish_trade(tick, timestamp, trade.clone());
                            } else {
                                reject_count += 1;
                            }
                        }
                        self.maybe_inject_liquidity(mid, timestamp);
                    }
                    None => {
                        market_fault_count += 1;
                        self.events.publish_fault(tick, timestamp, MarketFault { market_id: mid });
                    }
                }
            }
        }

        #[cfg(not(feature = "parallel"))]
        {
            for mid in &market_ids {
                let intents = orders_by_market.remove(mid).unwrap_or_default();
                let before = self.markets[*mid].clone();

                let outcome: std::thread::Result<Vec<Trade>> = {
                    let market = self.markets.get_mut(*mid).expect("market exists");
                    for intent in intents {
                        match intent {
                            Intent::Place(order) => market.order_book.insert(order),
                            Intent::Cancel { agent_id, order_id } => {
                                let owned = market
                                    .order_book
                                    .bids
                                    .iter()
                                    .chain(market.order_book.asks.iter())
                                    .any(|o| o.id == order_id && o.agent_id == agent_id);
                                if owned {
                                    market.order_book.cancel(order_id);
                                } else {
                                    reject_count += 1;
                                }
                            }
                        }
                    }
                    let mid = *mid;
                    panic::catch_unwind(AssertUnwindSafe(|| market.order_book.match_all(mid, timestamp)))
                };

                match outcome {
                    Ok(trades) => {
                        for trade in &trades {
                            if self.settle_trade(trade) {
                                trade_count += 1;
                                self.events.publish_trade(tick, timestamp, trade.clone());
                            } else {
                                reject_count += 1;
                            }
                        }
                        self.maybe_inject_liquidity(*mid, timestamp);
                    }
                    Err(_) => {
                        if let Some(slot) = self.markets.get_mut(*mid) {
                            *slot = before;
                        }
                        market_fault_count += 1;
                        self.events.publish_fault(tick, timestamp, MarketFault { market_id: *mid });
                    }
                }
            }
        }

        let mut behavior = AggregateBehavior::default();
        for agent in self.agents.values().filter(|a| !a.is_market_maker && a.is_active) {
            behavior.spending += agent.economic_behavior.spending;
            behavior.saving += agent.economic_behavior.saving;
            behavior.investment += agent.economic_behavior.investment;
            behavior.borrowing += agent.economic_behavior.borrowing;
        }

        if started.elapsed() > budget {
            return self.finish_overrun(started, reject_count, market_fault_count, trade_count);
        }

        // Step 3: reprice every market. Idempotent at equilibrium, so
        // always repricing subsumes the "activity or drift" gate in §4.1
        // without needing a separate heuristic.
        for mid in &market_ids {
            if let Some((buy_flow, sell_flow)) = flow.get(mid).copied() {
                let market = self.markets.get_mut(*mid).expect("market exists");
                let demand = market.base_demand + buy_flow;
                let supply = market.base_supply + sell_flow;
                market.set_demand(demand);
                market.set_supply(supply);
            }

            let market = &self.markets[*mid];
            let inputs = PricerInputs {
                supply: market.supply,
                demand: market.demand,
                current_price: market.current_price,
                elasticity: market.elasticity,
            };
            let output = pricer::reprice(&inputs, &self.config.pricer);
            let prev_price = market.current_price;
            let volume: Money = market.order_book.bid_depth() + market.order_book.ask_depth();
            let raw_volatility = if prev_price.is_zero() {
                0.0
            } else {
                crate::types::money_to_f64(((output.new_price - prev_price) / prev_price).abs())
            };

            let market = self.markets.get_mut(*mid).expect("market exists");
            market.current_price = output.new_price;
            market.push_history(timestamp, output.new_price, volume);
            market.volatility = (raw_volatility * self.psychology.volatility_multiplier).clamp(0.0, 1.0);

            #[cfg(feature = "instrument")]
            tracing::info!(target: "price_update", tick, market = %market.name, price = crate::types::money_to_f64(output.new_price));

            self.events.publish_price(tick, timestamp, PriceUpdate { market_id: *mid, price: output.new_price });
        }

        if started.elapsed() > budget {
            return self.finish_overrun(started, reject_count, market_fault_count, trade_count);
        }

        // Step 4: aggregate psychology.
        let active_agents: Vec<&Agent> = self.agents.values().filter(|a| a.is_active && !a.is_market_maker).collect();
        self.psychology = psychology::aggregate(active_agents.into_iter(), &mut self.psychology_decay, &self.config.psychology);
        self.events.publish_psychology(tick, timestamp, self.psychology);

        // Step 5: monetary update.
        let monetary_events = self.monetary_engine.tick(&mut self.monetary, &behavior, timestamp, &self.config.monetary);
        for event in monetary_events {
            self.events.publish_monetary(tick, timestamp, event);
        }

        if started.elapsed() > budget {
            return self.finish_overrun(started, reject_count, market_fault_count, trade_count);
        }

        // Step 6: scarcity update.
        let commodity_ids: Vec<CommodityId> = self.commodities.keys().collect();
        for cid in commodity_ids {
            let commodity = &mut self.commodities[cid];
            let events = self.scarcity_engine.tick(commodity);
            for event in events {
                self.events.publish_scarcity(tick, timestamp, event);
            }
        }

        // Step 7: publish tick summary.
        self.last_reject_count = reject_count;
        self.last_market_fault_count = market_fault_count;
        let elapsed = started.elapsed();
        #[cfg(feature = "instrument")]
        tracing::info!(target: "tick", tick, elapsed_ms = elapsed.as_millis() as u64, rejected_actions = reject_count, trade_count);
        self.events.publish_tick(
            tick,
            timestamp,
            TickSummary {
                processing_time_ms: elapsed.as_millis() as u64,
                rejected_actions: reject_count,
                market_faults: market_fault_count,
                trade_count,
            },
        );

        if elapsed > budget {
            self.events.publish_overrun(
                tick,
                timestamp,
                TickOverrun { budget_ms: self.config.tick_budget_ms, elapsed_ms: elapsed.as_millis() as u64 },
            );
            return Err(SimError::TickOverrun { budget_ms: self.config.tick_budget_ms, elapsed_ms: elapsed.as_millis() as u64 });
        }

        Ok(())
    }

    fn finish_overrun(
        &mut self,
        started: Instant,
        reject_count: u32,
        market_fault_count: u32,
        trade_count: u32,
    ) -> SimResult<()> {
        self.last_reject_count = reject_count;
        self.last_market_fault_count = market_fault_count;
        let elapsed = started.elapsed();
        self.events.publish_tick(
            self.tick_count,
            self.tick_count,
            TickSummary {
                processing_time_ms: elapsed.as_millis() as u64,
                rejected_actions: reject_count,
                market_faults: market_fault_count,
                trade_count,
            },
        );
        self.events.publish_overrun(
            self.tick_count,
            self.tick_count,
            TickOverrun { budget_ms: self.config.tick_budget_ms, elapsed_ms: elapsed.as_millis() as u64 },
        );
        Err(SimError::TickOverrun { budget_ms: self.config.tick_budget_ms, elapsed_ms: elapsed.as_millis() as u64 })
    }

    /// Convert a drained `Action` into a book intent, rejecting it
    /// (`Err(())`) if it fails intake-level validation: unknown market,
    /// insufficient wealth for a buy, or insufficient holdings for a sell.
    fn convert_action(&mut self, agent_id: AgentId, action: Action, timestamp: u64) -> Result<Option<(MarketId, Intent)>, ()> {
        match action {
            Action::Hold => Ok(None),
            Action::Cancel { market, order_id } => Ok(Some((market, Intent::Cancel { agent_id, order_id }))),
            Action::Buy { market, quantity, price_limit } => {
                let table = self.markets.get(market).ok_or(())?;
                let reference_price = price_limit.unwrap_or(table.current_price);
                let cost = reference_price * quantity;
                let agent = self.agents.get_mut(agent_id).ok_or(())?;
                if agent.wealth < cost {
                    return Err(());
                }
                let order_id = self.next_order_id;
                self.next_order_id += 1;
                Ok(Some((
                    market,
                    Intent::Place(Order {
                        id: order_id,
                        agent_id,
                        market_id: market,
                        side: Side::Buy,
                        price: price_limit,
                        quantity,
                        timestamp,
                        kind: if price_limit.is_some() { OrderKind::Limit } else { OrderKind::Market },
                    }),
                )))
            }
            Action::Sell { market, quantity, price_limit } => {
                if !self.markets.contains_key(market) {
                    return Err(());
                }
                let agent = self.agents.get_mut(agent_id).ok_or(())?;
                if agent.holding(market) < quantity {
                    return Err(());
                }
                let order_id = self.next_order_id;
                self.next_order_id += 1;
                Ok(Some((
                    market,
                    Intent::Place(Order {
                        id: order_id,
                        agent_id,
                        market_id: market,
                        side: Side::Sell,
                        price: price_limit,
                        quantity,
                        timestamp,
                        kind: if price_limit.is_some() { OrderKind::Limit } else { OrderKind::Market },
                    }),
                )))
            }
        }
    }

    /// Apply a matched trade's wealth/portfolio transfer. A market buy has
    /// no price bound at intake (it sweeps the book at whatever price rests
    /// there, e.g. a synthetic-MM ask above `current_price`), so affordability
    /// is re-checked here against the actual execution price; per §4.1 step
    /// 2 a trade that would leave the buyer's wealth negative is dropped
    /// instead of settled. Returns whether the trade was settled.
    fn settle_trade(&mut self, trade: &Trade) -> bool {
        let cost = trade.price * trade.quantity;
        let affordable = self.agents.get(trade.buyer_id).map(|b| b.wealth >= cost).unwrap_or(false);
        if !affordable {
            return false;
        }
        if let Some(buyer) = self.agents.get_mut(trade.buyer_id) {
            buyer.wealth -= cost;
            *buyer.portfolio.entry(trade.market_id).or_insert(Decimal::ZERO) += trade.quantity;
        }
        if let Some(seller) = self.agents.get_mut(trade.seller_id) {
            seller.wealth += cost;
            let holding = seller.portfolio.entry(trade.market_id).or_insert(Decimal::ZERO);
            *holding = (*holding - trade.quantity).max(Decimal::ZERO);
        }
        true
    }

    /// Liquidity-injection policy (spec §4.5): when depth and spread both
    /// sit below their configured floors, straddle the mid with synthetic
    /// MM orders split equally between the two sides.
    fn maybe_inject_liquidity(&mut self, market_id: MarketId, timestamp: u64) {
        let market = &self.markets[market_id];
        let depth = market.order_book.bid_depth() + market.order_book.ask_depth();
        let spread = market.order_book.spread();
        let illiquid =
            depth < self.config.liquidity_floor_depth || spread.map(|s| s > self.config.liquidity_floor_spread).unwrap_or(true);
        if !illiquid {
            return;
        }

        let mid = match (market.order_book.best_bid().and_then(|o| o.price), market.order_book.best_ask().and_then(|o| o.price)) {
            (Some(b), Some(a)) => (b + a) / Decimal::TWO,
            _ => market.current_price,
        };
        let half_spread = spread.unwrap_or(self.config.liquidity_floor_spread) / Decimal::TWO;
        let quarter_spread = half_spread / Decimal::TWO;
        let qty = self.config.liquidity_floor_depth / Decimal::TWO;

        let order_id_bid = self.next_order_id;
        self.next_order_id += 1;
        let order_id_ask = self.next_order_id;
        self.next_order_id += 1;

        let market = self.markets.get_mut(market_id).expect("market exists");
        market.order_book.insert(Order {
            id: order_id_bid,
            agent_id: self.market_maker,
            market_id,
            side: Side::Buy,
            price: Some(mid - quarter_spread),
            quantity: qty,
            timestamp,
            kind: OrderKind::SyntheticMm,
        });
        market.order_book.insert(Order {
            id: order_id_ask,
            agent_id: self.market_maker,
            market_id,
            side: Side::Sell,
            price: Some(mid + quarter_spread),
            quantity: qty,
            timestamp,
            kind: OrderKind::SyntheticMm,
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CommodityInit, CommodityType};
    use rust_decimal_macros::dec;

    fn cfg_with_market() -> KernelConfig {
        let mut cfg = KernelConfig::default();
        cfg.markets.push(MarketInit::new("food", dec!(100), dec!(1_000_000), dec!(1_000_000)));
        cfg
    }

    #[test]
    fn equilibrium_market_holds_price_across_ticks() {
        let mut kernel = Kernel::new(cfg_with_market());
        kernel.start().unwrap();
        for _ in 0..10 {
            kernel.tick_once().unwrap();
        }
        let snap = kernel.snapshot();
        let food = &snap.markets[0];
        assert!((food.current_price - dec!(100)).abs() <= dec!(0.01));
    }

    #[test]
    fn demand_pressure_strictly_raises_price() {
        let mut kernel = Kernel::new(cfg_with_market());
        kernel.start().unwrap();
        let market_id = kernel.markets.keys().next().unwrap();

        let mut agents = Vec::new();
        for _ in 0..50 {
            let id = kernel.register_agent(BehaviorProfile::Balanced).unwrap();
            kernel.agents[id].wealth = dec!(1_000_000);
            agents.push(id);
        }

        let mut prev = dec!(100);
        for _ in 0..5 {
            for &agent in &agents {
                kernel.submit_action(agent, Action::Buy { market: market_id, quantity: dec!(100), price_limit: None });
            }
            kernel.tick_once().unwrap();
            let snap = kernel.snapshot();
            let food = snap.markets.iter().find(|m| m.id == market_id).unwrap();
            assert!(food.current_price > prev);
            prev = food.current_price;
        }
    }

    #[test]
    fn register_agent_respects_capacity() {
        let mut cfg = cfg_with_market();
        cfg.max_agents = 2;
        let mut kernel = Kernel::new(cfg);
        kernel.start().unwrap();
        kernel.register_agent(BehaviorProfile::Balanced).unwrap();
        kernel.register_agent(BehaviorProfile::Balanced).unwrap();
        let err = kernel.register_agent(BehaviorProfile::Balanced).unwrap_err();
        assert!(matches!(err, SimError::CapacityExceeded { capacity: 2 }));
    }

    #[test]
    fn unregister_agent_cancels_open_orders() {
        let mut kernel = Kernel::new(cfg_with_market());
        kernel.start().unwrap();
        let market_id = kernel.markets.keys().next().unwrap();
        let agent = kernel.register_agent(BehaviorProfile::Balanced).unwrap();
        kernel.agents[agent].wealth = dec!(1_000_000);
        kernel.submit_action(agent, Action::Buy { market: market_id, quantity: dec!(10), price_limit: Some(dec!(50)) });
        kernel.tick_once().unwrap();
        assert!(!kernel.markets[market_id].order_book.bids.is_empty());

        kernel.unregister_agent(agent).unwrap();
        assert!(kernel.markets[market_id].order_book.bids.iter().all(|o| o.agent_id != agent));
    }

    #[test]
    fn start_rejects_invalid_configuration() {
        let mut cfg = KernelConfig::default();
        cfg.max_agents = 0;
        let mut kernel = Kernel::new(cfg);
        let err = kernel.start().unwrap_err();
        assert!(matches!(err, SimError::Fatal(_)));
        assert!(!kernel.is_running());
    }

    #[test]
    fn wealth_is_conserved_across_a_crossing_trade() {
        let mut kernel = Kernel::new(cfg_with_market());
        kernel.start().unwrap();
        let market_id = kernel.markets.keys().next().unwrap();

        let buyer = kernel.register_agent(BehaviorProfile::Aggressive).unwrap();
        kernel.agents[buyer].wealth = dec!(10_000);
        let seller = kernel.register_agent(BehaviorProfile::Conservative).unwrap();
        kernel.agents[seller].portfolio.insert(market_id, dec!(100));

        let total_before: Money = kernel.agents.values().map(|a| a.wealth).sum();

        kernel.submit_action(buyer, Action::Buy { market: market_id, quantity: dec!(50), price_limit: Some(dec!(120)) });
        kernel.submit_action(seller, Action::Sell { market: market_id, quantity: dec!(50), price_limit: Some(dec!(80)) });
        kernel.tick_once().unwrap();

        let total_after: Money = kernel.agents.values().map(|a| a.wealth).sum();
        assert_eq!(total_before, total_after, "a crossing trade must move wealth, never create or destroy it");
        assert_eq!(kernel.agents[seller].holding(market_id), dec!(50));
    }

    #[test]
    fn oil_discovery_strictly_reduces_scarcity() {
        let mut cfg = cfg_with_market();
        cfg.commodities.push(CommodityInit {
            id: "oil".to_string(),
            kind: CommodityType::Finite,
            initial_reserves: dec!(1000),
            consumption_rate: dec!(10),
            critical_threshold: dec!(100),
            k: 4.0,
        });
        let mut kernel = Kernel::new(cfg);
        kernel.start().unwrap();
        for _ in 0..40 {
            kernel.tick_once().unwrap();
        }
        let before = kernel.snapshot().scarcity[0].scarcity_level;
        kernel.trigger_discovery("oil", Some(dec!(400))).unwrap();
        let after = kernel.snapshot().scarcity[0].scarcity_level;
        assert!(after < before);
    }
}
