use std::collections::VecDeque;

use rex_schemas::TradeEvent;

/// Bounded FIFO buffer for trade events that couldn't be delivered while
/// the circuit was open (spec §4.9: "unsent events are buffered (bounded)
/// and retried when the circuit closes"). Oldest events are dropped once
/// full.
pub struct Outbox {
    capacity: usize,
    events: VecDeque<TradeEvent>,
    dropped: u64,
}

impl Outbox {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
            dropped: 0,
        }
    }

    pub fn push(&mut self, event: TradeEvent) {
        if self.events.len() >= self.capacity {
            self.events.pop_front();
            self.dropped += 1;
        }
        self.events.push_back(event);
    }

    /// Removes and returns every buffered event, oldest first.
    pub fn drain(&mut self) -> Vec<TradeEvent> {
        self.events.drain(..).collect()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn dropped_count(&self) -> u64 {
        self.dropped
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rex_schemas::{EventKind, Side};

    fn event(ticket: &str) -> TradeEvent {
        TradeEvent {
            event_kind: EventKind::Entry,
            strategy_id: "s1".into(),
            symbol: "EURUSD".into(),
            ticket: ticket.into(),
            side: Side::Buy,
            volume: 0.1,
            price: 1.1,
            time: Utc::now(),
            pnl_realized: None,
            reason: "entry".into(),
        }
    }

    #[test]
    fn drops_oldest_once_full() {
        let mut ob = Outbox::new(2);
        ob.push(event("1"));
        ob.push(event("2"));
        ob.push(event("3"));
        assert_eq!(ob.len(), 2);
        assert_eq!(ob.dropped_count(), 1);
        let drained = ob.drain();
        assert_eq!(drained[0].ticket, "2");
        assert_eq!(drained[1].ticket, "3");
        assert!(ob.is_empty());
    }
}
