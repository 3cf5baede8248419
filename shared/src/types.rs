use serde::{Deserialize, Serialize};

use crate::Member;

pub type Seqno = u64;
pub type ViewId = u64;
pub type HandlerTag = u16;

/// Which seqno space a sequenced packet belongs to. Every sender owns one
/// multicast stream and one unicast stream per destination.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Scope {
    Multicast,
    Unicast,
}

impl Scope {
    pub fn is_multicast(self) -> bool {
        matches!(self, Scope::Multicast)
    }
}

/// Destination of an outbound message
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Target {
    /// Every member of the current view
    Group,
    /// A single member
    Member(Member),
}

impl Target {
    pub fn scope(&self) -> Scope {
        match self {
            Target::Group => Scope::Multicast,
            Target::Member(_) => Scope::Unicast,
        }
    }
}
