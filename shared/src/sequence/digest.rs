use std::fmt;

use crate::{
    types::{Scope, Seqno},
    Member,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigestEntry {
    pub sender: Member,
    pub scope: Scope,
    /// Every seqno up to here has been delivered
    pub highest_delivered: Seqno,
    /// Highest seqno seen, including buffered ones
    pub highest_received: Seqno,
}

/// Snapshot of the receive state of every active inbound stream
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Digest {
    entries: Vec<DigestEntry>,
}

impl Digest {
    pub fn new(mut entries: Vec<DigestEntry>) -> Self {
        entries.sort_by(|a, b| (a.sender, a.scope).cmp(&(b.sender, b.scope)));
        Self { entries }
    }

    pub fn get(&self, sender: &Member, scope: Scope) -> Option<&DigestEntry> {
        self.entries
            .iter()
            .find(|entry| entry.sender == *sender && entry.scope == scope)
    }

    pub fn iter(&self) -> impl Iterator<Item = &DigestEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl fmt::Display for Digest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (index, entry) in self.entries.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(
                f,
                "{} {:?}: [{} ({})]",
                entry.sender, entry.scope, entry.highest_delivered, entry.highest_received
            )?;
        }
        Ok(())
    }
}
