use std::{fmt, net::SocketAddr};

use serde::{Deserialize, Serialize};

/// Identity of a group member. Two members are the same member if and only
/// if their addresses are equal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Member(SocketAddr);

impl Member {
    pub fn new(address: SocketAddr) -> Self {
        Self(address)
    }

    pub fn address(&self) -> SocketAddr {
        self.0
    }
}

impl From<SocketAddr> for Member {
    fn from(address: SocketAddr) -> Self {
        Self(address)
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
