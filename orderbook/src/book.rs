//! Synchronous book state machine.
//!
//! [`Book`] owns all state: the two priority queues, the arena of resting
//! entries, the id index, and the sequence counter. It has no interior
//! locking; the caller must serialize access. The async [`crate::OrderBook`]
//! does exactly that by driving a `Book` from a single worker task, but the
//! type is also usable directly for inline processing and benchmarks.

use std::collections::HashMap;

use crate::arena::{OrderArena, RestingEntry, SlotId};
use crate::clock::{Clock, SystemClock};
use crate::error::BookError;
use crate::queue::PriceTimeQueue;
use crate::types::{BookConfig, BookView, Order, OrderKind, Side, Trade};

pub struct Book {
    cfg: BookConfig,
    bids: PriceTimeQueue,
    asks: PriceTimeQueue,
    arena: OrderArena,
    /// id -> arena handle. An id is present iff its order rests on a queue.
    orders: HashMap<String, SlotId>,
    seq: u64,
    clock: Box<dyn Clock>,
}

impl Book {
    pub fn new(cfg: BookConfig) -> Self {
        Self::with_clock(cfg, SystemClock::new())
    }

    pub fn with_clock<C: Clock + 'static>(cfg: BookConfig, clock: C) -> Self {
        Self {
            bids: PriceTimeQueue::new(Side::Buy),
            asks: PriceTimeQueue::new(Side::Sell),
            arena: OrderArena::new(),
            orders: HashMap::new(),
            seq: 0,
            clock: Box::new(clock),
            cfg,
        }
    }

    pub fn config(&self) -> &BookConfig {
        &self.cfg
    }

    /// Number of resting orders on a side.
    pub fn depth(&self, side: Side) -> usize {
        match side {
            Side::Buy => self.bids.len(),
            Side::Sell => self.asks.len(),
        }
    }

    /// The resting order with this id, if any.
    pub fn resting(&self, id: &str) -> Option<&Order> {
        let slot = *self.orders.get(id)?;
        self.arena.get(slot).map(|entry| &entry.order)
    }

    /// Validates and matches an incoming order, returning the trades it
    /// produced in match order (best-priced resting entry first). A limit
    /// remainder rests on the book; a market remainder is dropped.
    pub fn submit(&mut self, mut order: Order) -> Result<Vec<Trade>, BookError> {
        self.validate(&order)?;

        self.seq += 1;
        order.sequence = self.seq;
        order.ts_ns = self.clock.now_ns();
        order.remaining = order.quantity;

        let trades = self.match_incoming(&mut order);
        if order.kind == OrderKind::Limit && order.remaining > 0 {
            self.post(order);
        }
        Ok(trades)
    }

    /// Removes a resting order.
    pub fn cancel(&mut self, id: &str) -> Result<(), BookError> {
        let slot = self
            .orders
            .remove(id)
            .ok_or_else(|| BookError::NotFound { id: id.to_string() })?;
        self.unlink(slot);
        Ok(())
    }

    /// Detaches a resting entry from its queue and frees its slot. The id
    /// index entry must already be gone.
    fn unlink(&mut self, slot: SlotId) {
        let (side, pos) = {
            let entry = &self.arena[slot];
            (entry.side, entry.heap_pos)
        };
        let Self {
            bids, asks, arena, ..
        } = self;
        let queue = match side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        queue.remove_at(arena, pos);
        arena.remove(slot);
    }

    /// Updates price and/or quantity of a resting order.
    ///
    /// The entry is assigned a fresh sequence and timestamp, so it loses
    /// time priority against earlier entries at the same price. An amend
    /// never crosses the book, even when the new price is marketable.
    pub fn amend(
        &mut self,
        id: &str,
        new_price: Option<i64>,
        new_qty: Option<i64>,
    ) -> Result<(), BookError> {
        let slot = *self
            .orders
            .get(id)
            .ok_or_else(|| BookError::NotFound { id: id.to_string() })?;
        if let Some(qty) = new_qty {
            if qty <= 0 {
                return Err(BookError::InvalidQuantity);
            }
        }
        if let Some(price) = new_price {
            if !self.aligned(price) {
                return Err(BookError::TickAlignment {
                    tick_size: self.cfg.tick_size,
                });
            }
        }

        self.seq += 1;
        let now = self.clock.now_ns();
        let entry = &mut self.arena[slot];
        if let Some(qty) = new_qty {
            entry.order.quantity = qty;
            entry.order.remaining = entry.order.remaining.min(qty);
        }
        if let Some(price) = new_price {
            entry.order.price = price;
        }
        entry.order.sequence = self.seq;
        entry.order.ts_ns = now;

        let side = entry.side;
        let pos = entry.heap_pos;
        let Self {
            bids, asks, arena, ..
        } = self;
        let queue = match side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        queue.fix(arena, pos);
        self.trim(side);
        Ok(())
    }

    /// Deep copy of the top of book.
    pub fn snapshot(&self) -> BookView {
        BookView {
            best_bid: self
                .bids
                .peek()
                .map(|slot| self.arena[slot].order.clone()),
            best_ask: self
                .asks
                .peek()
                .map(|slot| self.arena[slot].order.clone()),
        }
    }

    fn validate(&self, order: &Order) -> Result<(), BookError> {
        if order.symbol != self.cfg.symbol {
            return Err(BookError::SymbolMismatch {
                symbol: order.symbol.clone(),
                expected: self.cfg.symbol.clone(),
            });
        }
        if order.quantity <= 0 {
            return Err(BookError::InvalidQuantity);
        }
        if order.kind == OrderKind::Limit && !self.aligned(order.price) {
            return Err(BookError::TickAlignment {
                tick_size: self.cfg.tick_size,
            });
        }
        if self.orders.contains_key(&order.id) {
            return Err(BookError::DuplicateId {
                id: order.id.clone(),
            });
        }
        Ok(())
    }

    fn aligned(&self, price: i64) -> bool {
        self.cfg.tick_size > 0 && price > 0 && price % self.cfg.tick_size == 0
    }

    fn match_incoming(&mut self, incoming: &mut Order) -> Vec<Trade> {
        let mut trades = Vec::new();
        let opposing_side = incoming.side.opposite();

        while incoming.remaining > 0 {
            let Some(slot) = self.queue(opposing_side).peek() else {
                break;
            };
            let (resting_price, resting_remaining, resting_id) = {
                let best = &self.arena[slot].order;
                (best.price, best.remaining, best.id.clone())
            };
            if incoming.kind == OrderKind::Limit {
                let crosses = match incoming.side {
                    Side::Buy => incoming.price >= resting_price,
                    Side::Sell => incoming.price <= resting_price,
                };
                if !crosses {
                    break;
                }
            }

            let quantity = incoming.remaining.min(resting_remaining);
            incoming.remaining -= quantity;
            self.arena[slot].order.remaining -= quantity;

            trades.push(Trade {
                symbol: incoming.symbol.clone(),
                buy_order_id: trade_party(incoming, &resting_id, Side::Buy),
                sell_order_id: trade_party(incoming, &resting_id, Side::Sell),
                price: resting_price,
                quantity,
                ts_ns: self.clock.now_ns(),
            });

            if self.arena[slot].order.remaining == 0 {
                let Self {
                    bids, asks, arena, ..
                } = self;
                let queue = match opposing_side {
                    Side::Buy => bids,
                    Side::Sell => asks,
                };
                queue.pop(arena);
                arena.remove(slot);
                self.orders.remove(&resting_id);
            } else {
                // Remaining changed but price-time priority did not.
                let pos = self.arena[slot].heap_pos;
                let Self {
                    bids, asks, arena, ..
                } = self;
                let queue = match opposing_side {
                    Side::Buy => bids,
                    Side::Sell => asks,
                };
                queue.fix(arena, pos);
            }
        }

        trades
    }

    /// Rests a limit remainder on its side's queue and trims depth.
    fn post(&mut self, order: Order) {
        let id = order.id.clone();
        let side = order.side;
        let slot = self.arena.insert(RestingEntry {
            order,
            heap_pos: 0,
            side,
        });
        let Self {
            bids, asks, arena, ..
        } = self;
        let queue = match side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        queue.push(arena, slot);
        self.orders.insert(id, slot);
        self.trim(side);
    }

    /// Evicts worst-priority entries while the side exceeds `max_depth`.
    /// Evictions are silent: no trade, no error, the order is forgotten.
    fn trim(&mut self, side: Side) {
        let max_depth = self.cfg.max_depth;
        if max_depth == 0 {
            return;
        }
        let Self {
            bids,
            asks,
            arena,
            orders,
            ..
        } = self;
        let queue = match side {
            Side::Buy => bids,
            Side::Sell => asks,
        };
        while queue.len() > max_depth {
            let Some(pos) = queue.worst_pos(arena) else {
                break;
            };
            let slot = queue.remove_at(arena, pos);
            if let Some(entry) = arena.remove(slot) {
                orders.remove(&entry.order.id);
            }
        }
    }

    fn queue(&self, side: Side) -> &PriceTimeQueue {
        match side {
            Side::Buy => &self.bids,
            Side::Sell => &self.asks,
        }
    }
}

/// Id of whichever of the incoming and resting orders is on `wanted`.
/// The two orders are always on opposite sides, so one branch suffices.
fn trade_party(incoming: &Order, resting_id: &str, wanted: Side) -> String {
    if incoming.side == wanted {
        incoming.id.clone()
    } else {
        resting_id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use std::sync::Arc;

    fn book(symbol: &str, tick: i64, depth: usize) -> (Book, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new(0));
        let book = Book::with_clock(BookConfig::new(symbol, tick, depth), clock.clone());
        (book, clock)
    }

    #[test]
    fn limit_cross_trades_at_resting_price() {
        let (mut book, clock) = book("BTCUSD", 1, 10);

        let trades = book
            .submit(Order::limit("ask1", "BTCUSD", Side::Sell, 101, 5))
            .expect("ask accepted");
        assert!(trades.is_empty());

        clock.set(1);
        let trades = book
            .submit(Order::limit("bid1", "BTCUSD", Side::Buy, 102, 3))
            .expect("bid accepted");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buy_order_id, "bid1");
        assert_eq!(trades[0].sell_order_id, "ask1");
        assert_eq!(trades[0].price, 101);
        assert_eq!(trades[0].quantity, 3);

        let ask1 = book.resting("ask1").expect("ask1 still rests");
        assert_eq!(ask1.remaining, 2);
        assert!(book.resting("bid1").is_none());
        assert!(book.snapshot().best_bid.is_none());
    }

    #[test]
    fn market_order_sweeps_depth_and_drops_remainder() {
        let (mut book, clock) = book("ETHUSD", 1, 10);

        book.submit(Order::limit("ask1", "ETHUSD", Side::Sell, 50, 2))
            .expect("ask1");
        book.submit(Order::limit("ask2", "ETHUSD", Side::Sell, 55, 5))
            .expect("ask2");

        clock.set(1);
        let trades = book
            .submit(Order::market("mkt1", "ETHUSD", Side::Buy, 4))
            .expect("market accepted");
        assert_eq!(trades.len(), 2);
        assert_eq!((trades[0].price, trades[0].quantity), (50, 2));
        assert_eq!((trades[1].price, trades[1].quantity), (55, 2));

        assert!(book.resting("ask1").is_none());
        assert_eq!(book.resting("ask2").map(|o| o.remaining), Some(3));
        assert_eq!(book.depth(Side::Buy), 0);
    }

    #[test]
    fn unfilled_market_remainder_is_discarded() {
        let (mut book, _clock) = book("SIM", 1, 10);
        let trades = book
            .submit(Order::market("mkt1", "SIM", Side::Sell, 7))
            .expect("accepted");
        assert!(trades.is_empty());
        assert_eq!(book.depth(Side::Sell), 0);
        assert!(book.resting("mkt1").is_none());
    }

    #[test]
    fn amend_reprices_and_requeues() {
        let (mut book, clock) = book("SOLUSD", 1, 5);

        book.submit(Order::limit("bid1", "SOLUSD", Side::Buy, 10, 1))
            .expect("bid1");
        book.submit(Order::limit("bid2", "SOLUSD", Side::Buy, 9, 1))
            .expect("bid2");
        assert_eq!(
            book.snapshot().best_bid.map(|o| o.id),
            Some("bid1".to_string())
        );

        clock.set(1);
        book.amend("bid2", Some(8), None).expect("amend");
        book.cancel("bid1").expect("cancel");

        let trades = book
            .submit(Order::limit("ask1", "SOLUSD", Side::Sell, 8, 1))
            .expect("ask1");
        assert_eq!(trades.len(), 1);
        assert_eq!(trades[0].buy_order_id, "bid2");
        assert_eq!(trades[0].price, 8);
    }

    #[test]
    fn amend_clamps_remaining_and_refreshes_sequence() {
        let (mut book, _clock) = book("SIM", 1, 10);

        book.submit(Order::limit("ask1", "SIM", Side::Sell, 10, 5))
            .expect("ask1");
        book.submit(Order::limit("bid1", "SIM", Side::Buy, 10, 2))
            .expect("bid1 fills 2");
        let before = book.resting("ask1").expect("rests").clone();
        assert_eq!(before.remaining, 3);

        book.amend("ask1", None, Some(2)).expect("shrink");
        let after = book.resting("ask1").expect("rests");
        assert_eq!(after.quantity, 2);
        assert_eq!(after.remaining, 2);
        assert!(after.sequence > before.sequence);

        // Growing quantity leaves remaining alone.
        book.amend("ask1", None, Some(9)).expect("grow");
        let grown = book.resting("ask1").expect("rests");
        assert_eq!(grown.quantity, 9);
        assert_eq!(grown.remaining, 2);
    }

    #[test]
    fn amend_loses_time_priority_at_same_price() {
        let (mut book, clock) = book("SIM", 1, 10);

        book.submit(Order::limit("first", "SIM", Side::Buy, 10, 1))
            .expect("first");
        clock.set(1);
        book.submit(Order::limit("second", "SIM", Side::Buy, 10, 1))
            .expect("second");

        // Amending re-stamps "first", sending it behind "second".
        clock.set(2);
        book.amend("first", None, Some(1)).expect("amend");

        let trades = book
            .submit(Order::limit("ask", "SIM", Side::Sell, 10, 1))
            .expect("ask");
        assert_eq!(trades[0].buy_order_id, "second");
    }

    #[test]
    fn amend_rejects_bad_inputs_without_mutating() {
        let (mut book, _clock) = book("SIM", 5, 10);

        book.submit(Order::limit("bid1", "SIM", Side::Buy, 10, 4))
            .expect("bid1");
        let before = book.resting("bid1").expect("rests").clone();

        assert_eq!(
            book.amend("bid1", None, Some(0)),
            Err(BookError::InvalidQuantity)
        );
        assert_eq!(
            book.amend("bid1", Some(12), None),
            Err(BookError::TickAlignment { tick_size: 5 })
        );
        // Valid qty alongside an invalid price must not stick either.
        assert_eq!(
            book.amend("bid1", Some(12), Some(2)),
            Err(BookError::TickAlignment { tick_size: 5 })
        );
        assert_eq!(book.resting("bid1"), Some(&before));

        assert_eq!(
            book.amend("ghost", Some(10), None),
            Err(BookError::NotFound {
                id: "ghost".to_string()
            })
        );
    }

    #[test]
    fn depth_trimming_evicts_worst_priority() {
        let (mut book, clock) = book("ADAUSD", 1, 2);

        book.submit(Order::limit("bid1", "ADAUSD", Side::Buy, 10, 1))
            .expect("bid1");
        clock.set(1);
        book.submit(Order::limit("bid2", "ADAUSD", Side::Buy, 9, 1))
            .expect("bid2");
        clock.set(2);
        book.submit(Order::limit("bid3", "ADAUSD", Side::Buy, 8, 1))
            .expect("bid3");

        assert_eq!(book.depth(Side::Buy), 2);
        assert!(book.resting("bid3").is_none());
        assert_eq!(
            book.cancel("bid3"),
            Err(BookError::NotFound {
                id: "bid3".to_string()
            })
        );
        assert_eq!(
            book.amend("bid3", Some(10), None),
            Err(BookError::NotFound {
                id: "bid3".to_string()
            })
        );
    }

    #[test]
    fn snapshot_returns_independent_copies() {
        let (mut book, _clock) = book("XRPUSD", 1, 5);

        book.submit(Order::limit("bid1", "XRPUSD", Side::Buy, 10, 1))
            .expect("bid1");
        book.submit(Order::limit("ask1", "XRPUSD", Side::Sell, 12, 1))
            .expect("ask1");

        let mut first = book.snapshot();
        let bid = first.best_bid.as_mut().expect("bid present");
        bid.price = 1;

        let second = book.snapshot();
        assert_eq!(second.best_bid.map(|o| o.price), Some(10));
        assert_eq!(second.best_ask.map(|o| o.price), Some(12));
    }

    #[test]
    fn idempotent_snapshot_without_interleaved_change() {
        let (mut book, _clock) = book("SIM", 1, 5);
        book.submit(Order::limit("bid1", "SIM", Side::Buy, 10, 1))
            .expect("bid1");
        assert_eq!(book.snapshot(), book.snapshot());
    }

    #[test]
    fn tick_alignment_enforced_for_limits_only() {
        let (mut book, _clock) = book("SIM", 5, 10);

        assert_eq!(
            book.submit(Order::limit("x", "SIM", Side::Buy, 12, 1)),
            Err(BookError::TickAlignment { tick_size: 5 })
        );
        assert_eq!(book.depth(Side::Buy), 0);

        book.submit(Order::limit("x", "SIM", Side::Buy, 10, 1))
            .expect("aligned price accepted");

        // Market orders ignore price entirely.
        book.submit(Order::market("m", "SIM", Side::Sell, 1))
            .expect("market accepted");
    }

    #[test]
    fn symbol_and_quantity_validation() {
        let (mut book, _clock) = book("SIM", 1, 10);

        assert_eq!(
            book.submit(Order::limit("x", "OTHER", Side::Buy, 10, 1)),
            Err(BookError::SymbolMismatch {
                symbol: "OTHER".to_string(),
                expected: "SIM".to_string()
            })
        );
        assert_eq!(
            book.submit(Order::limit("x", "SIM", Side::Buy, 10, 0)),
            Err(BookError::InvalidQuantity)
        );
        assert_eq!(
            book.submit(Order::limit("x", "SIM", Side::Buy, 10, -3)),
            Err(BookError::InvalidQuantity)
        );
    }

    #[test]
    fn duplicate_resting_id_is_rejected_until_released() {
        let (mut book, _clock) = book("SIM", 1, 10);

        book.submit(Order::limit("dup", "SIM", Side::Buy, 10, 1))
            .expect("first");
        assert_eq!(
            book.submit(Order::limit("dup", "SIM", Side::Buy, 11, 1)),
            Err(BookError::DuplicateId {
                id: "dup".to_string()
            })
        );

        // Once the order leaves the book, the id may be reused.
        book.cancel("dup").expect("cancel");
        book.submit(Order::limit("dup", "SIM", Side::Buy, 10, 1))
            .expect("reuse after cancel");
    }

    #[test]
    fn price_time_priority_at_equal_price() {
        let (mut book, clock) = book("SIM", 1, 10);

        book.submit(Order::limit("early", "SIM", Side::Sell, 100, 5))
            .expect("early");
        clock.set(1);
        book.submit(Order::limit("late", "SIM", Side::Sell, 100, 4))
            .expect("late");

        let trades = book
            .submit(Order::limit("bid", "SIM", Side::Buy, 100, 7))
            .expect("bid");
        assert_eq!(trades.len(), 2);
        assert_eq!(trades[0].sell_order_id, "early");
        assert_eq!(trades[0].quantity, 5);
        assert_eq!(trades[1].sell_order_id, "late");
        assert_eq!(trades[1].quantity, 2);
        assert_eq!(book.resting("late").map(|o| o.remaining), Some(2));
    }

    #[test]
    fn shares_are_conserved_across_partial_fills() {
        let (mut book, _clock) = book("SIM", 1, 10);

        book.submit(Order::limit("a", "SIM", Side::Sell, 10, 3))
            .expect("a");
        book.submit(Order::limit("b", "SIM", Side::Sell, 11, 4))
            .expect("b");

        let quantity = 9;
        let trades = book
            .submit(Order::limit("bid", "SIM", Side::Buy, 11, quantity))
            .expect("bid");
        let filled: i64 = trades.iter().map(|t| t.quantity).sum();
        let remaining = book.resting("bid").map(|o| o.remaining).unwrap_or(0);
        assert_eq!(filled + remaining, quantity);
        assert_eq!(filled, 7);
        assert_eq!(remaining, 2);
    }

    #[test]
    fn sequence_is_strictly_increasing_across_accepts() {
        let (mut book, _clock) = book("SIM", 1, 10);

        book.submit(Order::limit("a", "SIM", Side::Buy, 10, 1))
            .expect("a");
        let seq_a = book.resting("a").map(|o| o.sequence).unwrap_or(0);

        // A rejected submit must not consume a sequence number.
        let _ = book.submit(Order::limit("bad", "SIM", Side::Buy, 0, 1));

        book.submit(Order::limit("b", "SIM", Side::Buy, 9, 1))
            .expect("b");
        let seq_b = book.resting("b").map(|o| o.sequence).unwrap_or(0);
        assert_eq!(seq_b, seq_a + 1);

        book.amend("a", None, Some(2)).expect("amend");
        let seq_a2 = book.resting("a").map(|o| o.sequence).unwrap_or(0);
        assert_eq!(seq_a2, seq_b + 1);
    }

    #[test]
    fn resting_book_is_never_crossed() {
        let (mut book, clock) = book("SIM", 1, 10);

        book.submit(Order::limit("ask", "SIM", Side::Sell, 100, 5))
            .expect("ask");
        clock.set(1);
        // Crossing bid larger than the ask: consumes it, rests remainder.
        book.submit(Order::limit("bid", "SIM", Side::Buy, 103, 8))
            .expect("bid");

        let view = book.snapshot();
        let best_bid = view.best_bid.expect("bid rests");
        assert!(view.best_ask.is_none());
        assert_eq!(best_bid.remaining, 3);

        clock.set(2);
        book.submit(Order::limit("ask2", "SIM", Side::Sell, 110, 1))
            .expect("ask2");
        let view = book.snapshot();
        let bid_price = view.best_bid.map(|o| o.price).unwrap_or(0);
        let ask_price = view.best_ask.map(|o| o.price).unwrap_or(i64::MAX);
        assert!(bid_price < ask_price);
    }

    #[test]
    fn eviction_can_reject_the_incoming_order_itself() {
        let (mut book, clock) = book("SIM", 1, 1);

        book.submit(Order::limit("good", "SIM", Side::Buy, 10, 1))
            .expect("good");
        clock.set(1);
        // Worse than the resting bid; trimmed right back out.
        book.submit(Order::limit("worse", "SIM", Side::Buy, 5, 1))
            .expect("accepted then evicted");

        assert_eq!(book.depth(Side::Buy), 1);
        assert!(book.resting("good").is_some());
        assert!(book.resting("worse").is_none());
    }
}
