use std::fmt;

use serde::{Deserialize, Serialize};

use crate::types::Seqno;

/// An inclusive range of seqnos, `start <= end`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SeqnoRange {
    start: Seqno,
    end: Seqno,
}

impl SeqnoRange {
    /// Returns `None` when `start > end`
    pub fn new(start: Seqno, end: Seqno) -> Option<Self> {
        if start > end {
            return None;
        }
        Some(Self { start, end })
    }

    pub fn single(seqno: Seqno) -> Self {
        Self {
            start: seqno,
            end: seqno,
        }
    }

    pub fn start(&self) -> Seqno {
        self.start
    }

    pub fn end(&self) -> Seqno {
        self.end
    }

    pub fn contains(&self, seqno: Seqno) -> bool {
        self.start <= seqno && seqno <= self.end
    }

    /// Number of seqnos covered
    pub fn len(&self) -> u64 {
        (self.end - self.start).saturating_add(1)
    }

    pub fn iter(&self) -> impl Iterator<Item = Seqno> {
        self.start..=self.end
    }
}

impl fmt::Display for SeqnoRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}
