//! Agents: external participants that submit actions and hold a
//! portfolio (spec §3). The kernel owns the registry; an agent's
//! pending-action queue and portfolio are logically its own, accessed
//! only through the kernel's tick pipeline.

use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{Action, AgentId, BehaviorProfile, MarketId, Money};

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct EconomicBehavior {
    pub spending: Money,
    pub saving: Money,
    pub investment: Money,
    pub borrowing: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Agent {
    pub id: AgentId,
    pub wealth: Money,
    pub portfolio: HashMap<MarketId, Money>,
    pub sentiment: f64,
    pub fear: f64,
    pub greed: f64,
    pub confidence: f64,
    pub behavior_profile: BehaviorProfile,
    pub is_active: bool,
    #[serde(skip)]
    pub pending_actions: VecDeque<Action>,
    pub economic_behavior: EconomicBehavior,
    /// Internal liquidity-provider agent owned by the Kernel (spec §4.5's
    /// synthetic MM orders need an owner). Excluded from psychology and
    /// monetary aggregation and from the registered-agent capacity count.
    #[serde(default)]
    pub is_market_maker: bool,
}

impl Agent {
    pub fn new(id: AgentId, behavior_profile: BehaviorProfile) -> Self {
        Self {
            id,
            wealth: Decimal::ZERO,
            portfolio: HashMap::new(),
            sentiment: 0.5,
            fear: 0.5,
            greed: 0.5,
            confidence: 0.5,
            behavior_profile,
            is_active: true,
            pending_actions: VecDeque::new(),
            economic_behavior: EconomicBehavior::default(),
            is_market_maker: false,
        }
    }

    pub fn holding(&self, market: MarketId) -> Money {
        self.portfolio.get(&market).copied().unwrap_or(Decimal::ZERO)
    }

    pub fn enqueue(&mut self, action: Action) {
        self.pending_actions.push_back(action);
    }

    /// Pop up to `n` pending actions for this tick's intake (spec §4.1 step 1).
    pub fn drain_actions(&mut self, n: u32) -> Vec<Action> {
        let mut out = Vec::with_capacity(n as usize);
        for _ in 0..n {
            match self.pending_actions.pop_front() {
                Some(a) => out.push(a),
                None => break,
            }
        }
        out
    }
}
