use std::collections::BTreeSet;

use crate::{sequence::SeqnoRange, types::Seqno};

/// How a seqno relates to what a sender has already been seen to send
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    /// The seqno closed the gap at the front. Every seqno up to and
    /// including `through` has now been seen.
    Delivered { through: Seqno },
    /// Already seen
    Duplicate,
    /// Arrived ahead of at least one missing seqno
    OutOfOrder,
}

/// Received seqnos of one sender stream. Seqnos start at 1, 0 means nothing
/// has been seen yet.
///
/// `received` only ever holds values above `highest_contiguous`.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct SeqnoTracker {
    highest_contiguous: Seqno,
    received: BTreeSet<Seqno>,
}

impl SeqnoTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, seqno: Seqno) -> Classification {
        if seqno <= self.highest_contiguous {
            return Classification::Duplicate;
        }

        if Some(seqno) == self.highest_contiguous.checked_add(1) {
            self.highest_contiguous = seqno;
            self.absorb();
            return Classification::Delivered {
                through: self.highest_contiguous,
            };
        }

        if self.received.insert(seqno) {
            Classification::OutOfOrder
        } else {
            Classification::Duplicate
        }
    }

    /// Treats every seqno up to `through` as seen, as when the sender can no
    /// longer supply them. Returns the new highest contiguous seqno.
    pub fn fast_forward(&mut self, through: Seqno) -> Seqno {
        if through > self.highest_contiguous {
            self.highest_contiguous = through;
            self.received = match through.checked_add(1) {
                Some(next) => self.received.split_off(&next),
                None => BTreeSet::new(),
            };
            self.absorb();
        }
        self.highest_contiguous
    }

    /// Ranges between `highest_contiguous` and the highest seqno seen that
    /// have not arrived, in ascending order
    pub fn missing(&self) -> Vec<SeqnoRange> {
        let mut output = Vec::new();
        let mut next = self.highest_contiguous.saturating_add(1);

        for seqno in &self.received {
            if *seqno > next {
                if let Some(range) = SeqnoRange::new(next, seqno - 1) {
                    output.push(range);
                }
            }
            next = seqno.saturating_add(1);
        }

        output
    }

    pub fn highest_contiguous(&self) -> Seqno {
        self.highest_contiguous
    }

    /// Highest seqno seen, contiguous or not
    pub fn highest_received(&self) -> Seqno {
        self.received
            .last()
            .copied()
            .unwrap_or(self.highest_contiguous)
    }

    pub fn has_received(&self, seqno: Seqno) -> bool {
        seqno <= self.highest_contiguous || self.received.contains(&seqno)
    }

    pub fn has_gaps(&self) -> bool {
        !self.received.is_empty()
    }

    pub fn out_of_order_count(&self) -> usize {
        self.received.len()
    }

    pub fn reset(&mut self) {
        self.highest_contiguous = 0;
        self.received.clear();
    }

    fn absorb(&mut self) {
        while let Some(next) = self.highest_contiguous.checked_add(1) {
            if !self.received.remove(&next) {
                break;
            }
            self.highest_contiguous = next;
        }
    }
}
