use std::time::{Duration, Instant};

use bytes::Bytes;

use crate::{
    sequence::{Classification, SeqnoRange, SeqnoTracker, SequenceBuffer, SequenceError},
    types::Seqno,
};

/// Whether a sender stream has state on this node
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StreamState {
    /// Nothing received since creation or the last reset
    Idle,
    Active,
}

pub(crate) enum Arrival {
    /// Messages that became deliverable, in ascending seqno order
    Delivered(Vec<(Seqno, Bytes)>),
    Duplicate,
    Buffered,
    /// Out of order but the buffer is at its limit
    Overflow,
}

// InboundStream
pub(crate) struct InboundStream {
    tracker: SeqnoTracker,
    buffer: SequenceBuffer<Bytes>,
    last_retransmit_request: Option<Instant>,
}

impl InboundStream {
    pub fn new() -> Self {
        Self {
            tracker: SeqnoTracker::new(),
            buffer: SequenceBuffer::new(),
            last_retransmit_request: None,
        }
    }

    /// Classifies the message and, when it closes the front gap, pops it
    /// together with every buffered message that is now contiguous.
    ///
    /// The buffer always holds exactly the tracker's out-of-order seqnos.
    pub fn process(
        &mut self,
        seqno: Seqno,
        payload: Bytes,
        max_buffered: usize,
    ) -> Result<Arrival, SequenceError> {
        let out_of_order = seqno > self.tracker.highest_contiguous().saturating_add(1);
        if out_of_order && !self.tracker.has_received(seqno) && self.buffer.len() >= max_buffered
        {
            return Ok(Arrival::Overflow);
        }

        match self.tracker.record(seqno) {
            Classification::Duplicate => Ok(Arrival::Duplicate),
            Classification::OutOfOrder => {
                self.buffer.try_insert_scan_from_back(seqno, payload)?;
                Ok(Arrival::Buffered)
            }
            Classification::Delivered { through } => {
                let mut output = Vec::with_capacity(1 + self.buffer.len());
                output.push((seqno, payload));
                output.extend(self.buffer.drain_through(through));
                if !self.tracker.has_gaps() {
                    self.last_retransmit_request = None;
                }
                Ok(Arrival::Delivered(output))
            }
        }
    }

    /// Skips everything up to `through` and pops whatever became contiguous
    pub fn fast_forward(&mut self, through: Seqno) -> Vec<(Seqno, Bytes)> {
        let before = self.tracker.highest_contiguous();
        let after = self.tracker.fast_forward(through);
        if after == before {
            return Vec::new();
        }

        // skipped seqnos that did arrive are still handed over, in order
        self.buffer.drain_through(after)
    }

    /// Returns the missing ranges when a retransmission request is due,
    /// at most once per `interval`
    pub fn retransmit_due(&mut self, now: Instant, interval: Duration) -> Option<Vec<SeqnoRange>> {
        if !self.tracker.has_gaps() {
            return None;
        }
        if let Some(last) = self.last_retransmit_request {
            if now.saturating_duration_since(last) < interval {
                return None;
            }
        }
        self.last_retransmit_request = Some(now);
        Some(self.tracker.missing())
    }

    pub fn tracker(&self) -> &SeqnoTracker {
        &self.tracker
    }

    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }
}
