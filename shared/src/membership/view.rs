use std::{collections::HashSet, fmt, sync::Arc};

use serde::{Deserialize, Serialize};

use crate::{types::ViewId, Member};

/// The agreed membership of the group at one point in time. Members keep
/// join order; the first member is the coordinator.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    id: ViewId,
    members: Vec<Member>,
}

impl View {
    /// Creates a view. Repeated members are dropped, keeping the first
    /// occurrence so join order is preserved.
    pub fn new(id: ViewId, members: Vec<Member>) -> Self {
        let mut seen = HashSet::with_capacity(members.len());
        let members = members
            .into_iter()
            .filter(|member| seen.insert(*member))
            .collect();
        Self { id, members }
    }

    pub fn id(&self) -> ViewId {
        self.id
    }

    pub fn members(&self) -> &[Member] {
        &self.members
    }

    pub fn coordinator(&self) -> Option<&Member> {
        self.members.first()
    }

    pub fn contains(&self, member: &Member) -> bool {
        self.members.contains(member)
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Returns `(joined, left)` going from `old` to `new`. Joined members
    /// are listed in `new`'s order, left members in `old`'s order.
    pub fn diff(old: Option<&View>, new: &View) -> (Vec<Member>, Vec<Member>) {
        let Some(old) = old else {
            return (new.members.clone(), Vec::new());
        };

        let joined = new
            .members
            .iter()
            .filter(|member| !old.contains(member))
            .copied()
            .collect();
        let left = old
            .members
            .iter()
            .filter(|member| !new.contains(member))
            .copied()
            .collect();

        (joined, left)
    }
}

impl fmt::Display for View {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ({}) [", self.id, self.members.len())?;
        for (index, member) in self.members.iter().enumerate() {
            if index > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", member)?;
        }
        write!(f, "]")
    }
}

/// Outcome of a successful view install
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ViewChange {
    pub view: Arc<View>,
    pub joined: Vec<Member>,
    pub left: Vec<Member>,
}

impl ViewChange {
    pub fn view_id(&self) -> ViewId {
        self.view.id()
    }
}
