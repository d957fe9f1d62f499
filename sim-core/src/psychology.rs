//! Psychology Aggregator: per-agent sentiment/fear/greed/confidence folded
//! into a global mood, herding factor, and volatility multiplier (spec
//! §4.5). Inherently statistical — this module is float throughout, as
//! spec.md §9 allows.

use serde::{Deserialize, Serialize};

use crate::agent::Agent;
use crate::config::PsychologyConfig;

const MAX_SENTIMENT_VARIANCE: f64 = 0.25;

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PsychologyState {
    pub global_sentiment: f64,
    pub fear_index: f64,
    pub greed_index: f64,
    pub confidence_index: f64,
    pub herding_factor: f64,
    pub volatility_multiplier: f64,
}

impl Default for PsychologyState {
    fn default() -> Self {
        Self {
            global_sentiment: 0.5,
            fear_index: 0.5,
            greed_index: 0.5,
            confidence_index: 0.5,
            herding_factor: 0.0,
            volatility_multiplier: 1.0,
        }
    }
}

/// Decay state for an externally-triggered psychology event (e.g. a
/// "market_crash" shock). Exponentially relaxes the fear floor back to
/// neutral over `cfg.decay_ticks`.
#[derive(Debug, Clone, Copy, Default)]
pub struct DecayState {
    /// Remaining ticks of elevated fear floor, 0 when quiescent.
    ticks_remaining: u32,
    window: u32,
    fear_floor: f64,
}

impl DecayState {
    pub fn trigger(&mut self, intensity: f64, cfg: &PsychologyConfig) {
        let intensity = intensity.clamp(0.0, 1.0);
        self.fear_floor = 0.5 + 0.5 * intensity;
        self.window = cfg.decay_ticks.max(1);
        self.ticks_remaining = self.window;
    }

    /// Current fear floor for this tick, then advances the decay clock.
    fn step(&mut self) -> f64 {
        if self.ticks_remaining == 0 {
            return 0.0;
        }
        let elapsed = self.window - self.ticks_remaining;
        let decayed = self.fear_floor * 0.5f64.powf(elapsed as f64 / self.window as f64);
        self.ticks_remaining -= 1;
        decayed
    }
}

// The `parallel` feature shards these folds across agents with rayon;
// sequential sum is the default (and always correct, since f64 addition
// here is order-independent within the precision this model needs).

#[cfg(feature = "parallel")]
fn mean(xs: &[f64]) -> f64 {
    use rayon::prelude::*;
    if xs.is_empty() {
        return 0.5;
    }
    xs.par_iter().sum::<f64>() / xs.len() as f64
}

#[cfg(not(feature = "parallel"))]
fn mean(xs: &[f64]) -> f64 {
    if xs.is_empty() {
        return 0.5;
    }
    xs.iter().sum::<f64>() / xs.len() as f64
}

#[cfg(feature = "parallel")]
fn variance(xs: &[f64], mean: f64) -> f64 {
    use rayon::prelude::*;
    if xs.is_empty() {
        return 0.0;
    }
    xs.par_iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
}

#[cfg(not(feature = "parallel"))]
fn variance(xs: &[f64], mean: f64) -> f64 {
    if xs.is_empty() {
        return 0.0;
    }
    xs.iter().map(|x| (x - mean).powi(2)).sum::<f64>() / xs.len() as f64
}

/// Aggregate psychology across active agents. `decay` carries any
/// externally-triggered fear floor forward tick to tick.
pub fn aggregate<'a>(
    active_agents: impl Iterator<Item = &'a Agent>,
    decay: &mut DecayState,
    cfg: &PsychologyConfig,
) -> PsychologyState {
    let agents: Vec<&Agent> = active_agents.collect();

    let sentiments: Vec<f64> = agents.iter().map(|a| a.sentiment).collect();
    let fears: Vec<f64> = agents.iter().map(|a| a.fear).collect();
    let greeds: Vec<f64> = agents.iter().map(|a| a.greed).collect();
    let confidences: Vec<f64> = agents.iter().map(|a| a.confidence).collect();

    let global_sentiment = mean(&sentiments);
    let mut fear_index = mean(&fears);
    let greed_index = mean(&greeds);
    let confidence_index = mean(&confidences);

    let herding_factor = 1.0 - (variance(&sentiments, global_sentiment) / MAX_SENTIMENT_VARIANCE).clamp(0.0, 1.0);

    let fear_floor = decay.step();
    fear_index = fear_index.max(fear_floor);

    let raw_multiplier = 1.0
        + (herding_factor - 0.5) * cfg.herding_weight
        + (fear_index - 0.5) * cfg.fear_weight;
    let volatility_multiplier = raw_multiplier.clamp(cfg.volatility_min, cfg.volatility_max);

    PsychologyState {
        global_sentiment,
        fear_index,
        greed_index,
        confidence_index,
        herding_factor,
        volatility_multiplier,
    }
}

/// Trigger an external psychology shock (e.g. a "market_crash" event)
/// with `intensity` in `[0, 1]`.
pub fn trigger_shock(decay: &mut DecayState, intensity: f64, cfg: &PsychologyConfig) {
    decay.trigger(intensity, cfg);
}
