//! Sorted bid/ask ladders and the cross-matching loop (spec §4.3).
//!
//! Bids are kept price-descending (ties broken by timestamp ascending);
//! asks price-ascending. `price: None` marks a market order — it sweeps
//! the opposite side until filled or the book runs dry, exactly standing
//! in for the "+inf for buys, 0 for sells" sentinel from the prose spec.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::{AgentId, MarketId, Money, OrderKind, Side};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: u64,
    pub agent_id: AgentId,
    pub market_id: MarketId,
    pub side: Side,
    /// `None` denotes a market order.
    pub price: Option<Money>,
    pub quantity: Money,
    pub timestamp: u64,
    pub kind: OrderKind,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Trade {
    pub market_id: MarketId,
    pub buyer_id: AgentId,
    pub seller_id: AgentId,
    pub price: Money,
    pub quantity: Money,
    pub timestamp: u64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OrderBook {
    /// Price-descending, ties by timestamp ascending.
    pub bids: Vec<Order>,
    /// Price-ascending, ties by timestamp ascending.
    pub asks: Vec<Order>,
}

fn bid_rank(price: Option<Money>, timestamp: u64) -> (std::cmp::Reverse<Money>, u64) {
    // Market buys sort as if priced at +infinity: rank above every limit bid.
    let key = price.unwrap_or(Decimal::MAX);
    (std::cmp::Reverse(key), timestamp)
}

fn ask_rank(price: Option<Money>, timestamp: u64) -> (Money, u64) {
    // Market sells sort as if priced at 0: rank below every limit ask.
    let key = price.unwrap_or(Decimal::ZERO);
    (key, timestamp)
}

impl OrderBook {
    pub fn insert(&mut self, order: Order) {
        match order.side {
            Side::Buy => {
                let key = bid_rank(order.price, order.timestamp);
                let pos = self
                    .bids
                    .partition_point(|o| bid_rank(o.price, o.timestamp) <= key);
                self.bids.insert(pos, order);
            }
            Side::Sell => {
                let key = ask_rank(order.price, order.timestamp);
                let pos = self
                    .asks
                    .partition_point(|o| ask_rank(o.price, o.timestamp) <= key);
                self.asks.insert(pos, order);
            }
        }
    }

    pub fn cancel(&mut self, order_id: u64) -> bool {
        let before = self.bids.len() + self.asks.len();
        self.bids.retain(|o| o.id != order_id);
        self.asks.retain(|o| o.id != order_id);
        before != self.bids.len() + self.asks.len()
    }

    pub fn best_bid(&self) -> Option<&Order> {
        self.bids.first()
    }

    pub fn best_ask(&self) -> Option<&Order> {
        self.asks.first()
    }

    pub fn bid_depth(&self) -> Money {
        self.bids.iter().map(|o| o.quantity).sum()
    }

    pub fn ask_depth(&self) -> Money {
        self.asks.iter().map(|o| o.quantity).sum()
    }

    /// `best_ask - best_bid`, or `None` if either side is empty. Limit
    /// prices only — a resting market order has no price to report.
    pub fn spread(&self) -> Option<Money> {
        let bid = self.bids.iter().find_map(|o| o.price)?;
        let ask = self.asks.iter().find_map(|o| o.price)?;
        Some(ask - bid)
    }

    /// Whether best_bid >= best_ask (a crossing pair remains to be
    /// matched). A market order always satisfies this check against any
    /// resting order on the opposite side.
    fn crosses(bid: &Order, ask: &Order) -> bool {
        match (bid.price, ask.price) {
            (Some(b), Some(a)) => b >= a,
            _ => true,
        }
    }

    /// Run the matching loop until no crossing pair remains. `timestamp`
    /// stamps every resulting trade.
    pub fn match_all(&mut self, market_id: MarketId, timestamp: u64) -> Vec<Trade> {
        let mut trades = Vec::new();

        loop {
            let Some(bid) = self.bids.first() else { break };
            let Some(ask) = self.asks.first() else { break };
            if !Self::crosses(bid, ask) {
                break;
            }

            let qty = bid.quantity.min(ask.quantity);
            let exec_price = match (bid.price, ask.price) {
                (Some(b), Some(a)) => (b + a) / Decimal::TWO,
                (Some(b), None) => b,
                (None, Some(a)) => a,
                // Two crossing market orders: no price reference at all.
                // Falls back to the last-seen trade price being absent;
                // the matcher itself is never handed two bare market
                // orders by the kernel (one side always has a quote), but
                // stay total rather than panic.
                (None, None) => Decimal::ZERO,
            };

            let buyer_id = bid.agent_id;
            let seller_id = ask.agent_id;

            trades.push(Trade {
                market_id,
                buyer_id,
                seller_id,
                price: exec_price,
                quantity: qty,
                timestamp,
            });

            {
                let bid = &mut self.bids[0];
                bid.quantity -= qty;
            }
            {
                let ask = &mut self.asks[0];
                ask.quantity -= qty;
            }
            if self.bids[0].quantity <= Decimal::ZERO {
                self.bids.remove(0);
            }
            if self.asks[0].quantity <= Decimal::ZERO {
                self.asks.remove(0);
            }
        }

        trades
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use slotmap::SlotMap;

    fn mk(side: Side, price: Option<Money>, qty: Decimal, ts: u64, agent: AgentId, id: u64, market: MarketId) -> Order {
        Order {
            id,
            agent_id: agent,
            market_id: market,
            side,
            price,
            quantity: qty,
            timestamp: ts,
            kind: if price.is_some() { OrderKind::Limit } else { OrderKind::Market },
        }
    }

    #[test]
    fn no_crossing_reports_depth_and_spread() {
        let mut agents: SlotMap<AgentId, ()> = SlotMap::with_key();
        let mut markets: SlotMap<MarketId, ()> = SlotMap::with_key();
        let a = agents.insert(());
        let m = markets.insert(());

        let mut book = OrderBook::default();
        book.insert(mk(Side::Buy, Some(dec!(105)), dec!(100), 0, a, 1, m));
        book.insert(mk(Side::Buy, Some(dec!(104)), dec!(150), 1, a, 2, m));
        book.insert(mk(Side::Buy, Some(dec!(103)), dec!(200), 2, a, 3, m));
        book.insert(mk(Side::Sell, Some(dec!(106)), dec!(120), 3, a, 4, m));
        book.insert(mk(Side::Sell, Some(dec!(107)), dec!(180), 4, a, 5, m));
        book.insert(mk(Side::Sell, Some(dec!(108)), dec!(250), 5, a, 6, m));

        let trades = book.match_all(m, 0);
        assert!(trades.is_empty());
        assert_eq!(book.spread(), Some(dec!(1)));
        assert_eq!(book.bid_depth(), dec!(450));
        assert_eq!(book.ask_depth(), dec!(550));
    }

    #[test]
    fn crossing_book_produces_midpoint_trades() {
        let mut agents: SlotMap<AgentId, ()> = SlotMap::with_key();
        let mut markets: SlotMap<MarketId, ()> = SlotMap::with_key();
        let buyer = agents.insert(());
        let seller1 = agents.insert(());
        let seller2 = agents.insert(());
        let m = markets.insert(());

        let mut book = OrderBook::default();
        book.insert(mk(Side::Buy, Some(dec!(108)), dec!(100), 0, buyer, 1, m));
        book.insert(mk(Side::Sell, Some(dec!(106)), dec!(60), 1, seller1, 2, m));
        book.insert(mk(Side::Sell, Some(dec!(107)), dec!(80), 2, seller2, 3, m));

        let trades = book.match_all(m, 0);
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].price, dec!(107));
        assert_eq!(trades[0].quantity, dec!(60));
        assert_eq!(trades[1].price, dec!(107.5));
        assert_eq!(trades[1].quantity, dec!(40));

        assert!(book.bids.is_empty());
        assert_eq!(book.asks.len(), 1);
        assert_eq!(book.asks[0].price, Some(dec!(107)));
        assert_eq!(book.asks[0].quantity, dec!(40));
    }
}
