//! Event Bus: typed publish/subscribe surface (spec §4.7).
//!
//! One bounded `tokio::sync::broadcast` channel per event kind, grounded
//! in the same crate other examples in this pack reach for to fan events
//! out to many observers. `broadcast::error::RecvError::Lagged(n)` is
//! exactly the "bounded queue + lag counter" the spec calls for, so
//! subscribers are never blocked by a slow peer — they just skip ahead
//! and learn how many events they missed.

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use crate::monetary::MonetaryEvent;
use crate::order_book::Trade;
use crate::psychology::PsychologyState;
use crate::scarcity::ScarcityEvent;
use crate::types::{MarketId, Money};

pub const DEFAULT_CHANNEL_CAPACITY: usize = 1024;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub tick: u64,
    pub timestamp: u64,
    pub seq: u64,
    pub payload: T,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TickSummary {
    pub processing_time_ms: u64,
    pub rejected_actions: u32,
    pub market_faults: u32,
    pub trade_count: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PriceUpdate {
    pub market_id: MarketId,
    pub price: Money,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MarketFault {
    pub market_id: MarketId,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct TickOverrun {
    pub budget_ms: u32,
    pub elapsed_ms: u64,
}

/// Number of events a lagging subscriber missed, surfaced back to the
/// caller instead of blocking delivery for everyone else.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Lag(pub u64);

macro_rules! channel {
    ($name:ident, $sender:ident, $receiver:ident, $payload:ty) => {
        pub type $sender = broadcast::Sender<Envelope<$payload>>;
        pub type $receiver = broadcast::Receiver<Envelope<$payload>>;
    };
}

channel!(Tick, TickSender, TickReceiver, TickSummary);
channel!(TradeCh, TradeSender, TradeReceiver, Trade);
channel!(PriceCh, PriceSender, PriceReceiver, PriceUpdate);
channel!(PsychologyCh, PsychologySender, PsychologyReceiver, PsychologyState);
channel!(MonetaryCh, MonetarySender, MonetaryReceiver, MonetaryEvent);
channel!(ScarcityCh, ScarcitySender, ScarcityReceiver, ScarcityEvent);
channel!(FaultCh, FaultSender, FaultReceiver, MarketFault);
channel!(OverrunCh, OverrunSender, OverrunReceiver, TickOverrun);

pub struct EventBus {
    tick: TickSender,
    trade: TradeSender,
    price: PriceSender,
    psychology: PsychologySender,
    monetary: MonetarySender,
    scarcity: ScarcitySender,
    fault: FaultSender,
    overrun: OverrunSender,
    seq: u64,
}

impl EventBus {
    pub fn new(capacity: usize) -> Self {
        Self {
            tick: broadcast::channel(capacity).0,
            trade: broadcast::channel(capacity).0,
            price: broadcast::channel(capacity).0,
            psychology: broadcast::channel(capacity).0,
            monetary: broadcast::channel(capacity).0,
            scarcity: broadcast::channel(capacity).0,
            fault: broadcast::channel(capacity).0,
            overrun: broadcast::channel(capacity).0,
            seq: 0,
        }
    }

    fn next_seq(&mut self) -> u64 {
        self.seq += 1;
        self.seq
    }

    fn wrap<T>(&mut self, tick: u64, timestamp: u64, payload: T) -> Envelope<T> {
        Envelope { tick, timestamp, seq: self.next_seq(), payload }
    }

    // Publishing never blocks — `broadcast::Sender::send` only fails
    // with `SendError` when there are zero subscribers, which is not an
    // error for this bus (nobody is listening yet).
    pub fn publish_tick(&mut self, tick: u64, timestamp: u64, payload: TickSummary) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.tick.send(env);
    }

    pub fn publish_trade(&mut self, tick: u64, timestamp: u64, payload: Trade) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.trade.send(env);
    }

    pub fn publish_price(&mut self, tick: u64, timestamp: u64, payload: PriceUpdate) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.price.send(env);
    }

    pub fn publish_psychology(&mut self, tick: u64, timestamp: u64, payload: PsychologyState) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.psychology.send(env);
    }

    pub fn publish_monetary(&mut self, tick: u64, timestamp: u64, payload: MonetaryEvent) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.monetary.send(env);
    }

    pub fn publish_scarcity(&mut self, tick: u64, timestamp: u64, payload: ScarcityEvent) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.scarcity.send(env);
    }

    pub fn publish_fault(&mut self, tick: u64, timestamp: u64, payload: MarketFault) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.fault.send(env);
    }

    pub fn publish_overrun(&mut self, tick: u64, timestamp: u64, payload: TickOverrun) {
        let env = self.wrap(tick, timestamp, payload);
        let _ = self.overrun.send(env);
    }

    pub fn subscribe_tick(&self) -> TickReceiver {
        self.tick.subscribe()
    }
    pub fn subscribe_trade(&self) -> TradeReceiver {
        self.trade.subscribe()
    }
    pub fn subscribe_price(&self) -> PriceReceiver {
        self.price.subscribe()
    }
    pub fn subscribe_psychology(&self) -> PsychologyReceiver {
        self.psychology.subscribe()
    }
    pub fn subscribe_monetary(&self) -> MonetaryReceiver {
        self.monetary.subscribe()
    }
    pub fn subscribe_scarcity(&self) -> ScarcityReceiver {
        self.scarcity.subscribe()
    }
    pub fn subscribe_fault(&self) -> FaultReceiver {
        self.fault.subscribe()
    }
    pub fn subscribe_overrun(&self) -> OverrunReceiver {
        self.overrun.subscribe()
    }
}

/// Drain every currently-available event from a receiver, synchronously.
/// Returns the events received plus the cumulative lag observed, so a
/// caller driving the kernel from plain (non-async) code never needs an
/// executor just to read the bus.
pub fn drain_sync<T: Clone>(rx: &mut broadcast::Receiver<Envelope<T>>) -> (Vec<Envelope<T>>, Option<Lag>) {
    let mut out = Vec::new();
    let mut lag = None;
    loop {
        match rx.try_recv() {
            Ok(env) => out.push(env),
            Err(broadcast::error::TryRecvError::Lagged(n)) => {
                lag = Some(Lag(lag.map(|Lag(prev)| prev + n).unwrap_or(n)));
            }
            Err(_) => break,
        }
    }
    (out, lag)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_strictly_monotonic() {
        let mut bus = EventBus::new(16);
        let mut rx = bus.subscribe_tick();
        for t in 0..5u64 {
            bus.publish_tick(
                t,
                t,
                TickSummary { processing_time_ms: 1, rejected_actions: 0, market_faults: 0, trade_count: 0 },
            );
        }
        let (events, lag) = drain_sync(&mut rx);
        assert!(lag.is_none());
        assert_eq!(events.len(), 5);
        for w in events.windows(2) {
            assert!(w[1].seq > w[0].seq);
        }
    }

    #[test]
    fn slow_subscriber_reports_lag_without_blocking_publish() {
        let mut bus = EventBus::new(4);
        let mut rx = bus.subscribe_tick();
        for t in 0..10u64 {
            bus.publish_tick(
                t,
                t,
                TickSummary { processing_time_ms: 1, rejected_actions: 0, market_faults: 0, trade_count: 0 },
            );
        }
        let (events, lag) = drain_sync(&mut rx);
        assert!(lag.is_some());
        assert!(events.len() <= 4);
    }
}
