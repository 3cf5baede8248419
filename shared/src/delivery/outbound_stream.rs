use std::collections::VecDeque;

use bytes::Bytes;

use crate::{sequence::SeqnoRange, types::Seqno};

// OutboundStream
pub(crate) struct OutboundStream {
    last_seqno: Seqno,
    log: VecDeque<(Seqno, Bytes)>,
    capacity: usize,
}

impl OutboundStream {
    pub fn new(capacity: usize) -> Self {
        Self {
            last_seqno: 0,
            log: VecDeque::new(),
            capacity,
        }
    }

    /// Assigns the next seqno and keeps the payload for retransmission
    pub fn stamp(&mut self, payload: Bytes) -> Seqno {
        self.last_seqno += 1;
        if self.capacity > 0 {
            self.log.push_back((self.last_seqno, payload));
            while self.log.len() > self.capacity {
                self.log.pop_front();
            }
        }
        self.last_seqno
    }

    /// Lowest seqno still held by the log
    pub fn first_available(&self) -> Seqno {
        self.log
            .front()
            .map(|(seqno, _)| *seqno)
            .unwrap_or(self.last_seqno + 1)
    }

    /// Collects logged messages inside `ranges`. The second value is set when
    /// part of a range has already been evicted from the log.
    pub fn lookup(&self, ranges: &[SeqnoRange]) -> (Vec<(Seqno, Bytes)>, Option<Seqno>) {
        let first_available = self.first_available();
        let mut output = Vec::new();
        let mut truncated = false;

        for range in ranges {
            if range.start() < first_available {
                truncated = true;
            }
            let start = range.start().max(first_available);
            let end = range.end().min(self.last_seqno);
            if start > end {
                continue;
            }
            for seqno in start..=end {
                let index = (seqno - first_available) as usize;
                if let Some((logged, payload)) = self.log.get(index) {
                    debug_assert_eq!(*logged, seqno);
                    output.push((seqno, payload.clone()));
                }
            }
        }

        (output, truncated.then_some(first_available))
    }

    pub fn last_seqno(&self) -> Seqno {
        self.last_seqno
    }
}
