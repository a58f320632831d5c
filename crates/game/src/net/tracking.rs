use std::collections::HashMap;

use crate::event::{DeliveryMethod, RelayEvent};

use super::protocol::{PacketHeader, sequence_greater_than};

const DEFAULT_REORDER_WINDOW: usize = 64;

/// Keeps only the newest packet from a source; anything older is stale.
#[derive(Debug, Default)]
pub struct SequencedReceiver {
    last: Option<u32>,
}

impl SequencedReceiver {
    pub fn accept(&mut self, sequence: u32) -> bool {
        match self.last {
            Some(last) if !sequence_greater_than(sequence, last) => false,
            _ => {
                self.last = Some(sequence);
                true
            }
        }
    }
}

/// Releases packets in send order, holding early arrivals until the gap
/// before them fills. When more than `window` packets are held the gap is
/// abandoned, since nothing below this layer retransmits.
#[derive(Debug)]
pub struct OrderedReceiver<T> {
    next: u32,
    held: HashMap<u32, T>,
    window: usize,
}

impl<T> Default for OrderedReceiver<T> {
    fn default() -> Self {
        Self::new(DEFAULT_REORDER_WINDOW)
    }
}

impl<T> OrderedReceiver<T> {
    pub fn new(window: usize) -> Self {
        Self {
            next: 0,
            held: HashMap::new(),
            window: window.max(1),
        }
    }

    pub fn receive(&mut self, sequence: u32, item: T) -> Vec<T> {
        let mut released = Vec::new();

        if sequence == self.next {
            released.push(item);
            self.next = self.next.wrapping_add(1);
        } else if sequence_greater_than(sequence, self.next) {
            self.held.entry(sequence).or_insert(item);
            if self.held.len() > self.window {
                let next = self.next;
                if let Some(&oldest) = self.held.keys().min_by_key(|s| s.wrapping_sub(next)) {
                    log::warn!(
                        "ordered channel skipping {} lost packet(s)",
                        oldest.wrapping_sub(next)
                    );
                    self.next = oldest;
                }
            }
        } else {
            return released;
        }

        while let Some(item) = self.held.remove(&self.next) {
            released.push(item);
            self.next = self.next.wrapping_add(1);
        }

        released
    }

    pub fn held(&self) -> usize {
        self.held.len()
    }
}

/// Inbound state for one remote node.
#[derive(Debug, Default)]
pub struct ChannelTracker {
    ordered: OrderedReceiver<RelayEvent>,
    sequenced: SequencedReceiver,
}

impl ChannelTracker {
    pub fn accept(&mut self, header: &PacketHeader, event: RelayEvent) -> Vec<RelayEvent> {
        match header.method {
            DeliveryMethod::ReliableOrdered => self.ordered.receive(header.sequence, event),
            DeliveryMethod::ReliableSequenced => {
                if self.sequenced.accept(header.sequence) {
                    vec![event]
                } else {
                    Vec::new()
                }
            }
        }
    }
}
