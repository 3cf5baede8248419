use std::sync::Arc;

use log::{info, warn};
use parking_lot::RwLock;

use crate::{
    membership::{MembershipError, View, ViewChange},
    types::ViewId,
    Member,
};

/// Holds the currently installed view. Installs are serialized by the write
/// lock and a view whose id does not exceed the installed one is rejected
/// without touching state.
pub struct MembershipView {
    current: RwLock<Option<Arc<View>>>,
}

impl MembershipView {
    pub fn new() -> Self {
        Self {
            current: RwLock::new(None),
        }
    }

    /// Installs `view` and reports who joined and who left
    pub fn install(&self, view: View) -> Result<ViewChange, MembershipError> {
        if view.is_empty() {
            return Err(MembershipError::EmptyView { view_id: view.id() });
        }

        let mut current = self.current.write();
        if let Some(installed) = current.as_ref() {
            if view.id() <= installed.id() {
                warn!(
                    "rejecting stale view {} (installed view is {})",
                    view.id(),
                    installed.id()
                );
                return Err(MembershipError::StaleView {
                    current: installed.id(),
                    proposed: view.id(),
                });
            }
        }

        let (joined, left) = View::diff(current.as_deref(), &view);
        let view = Arc::new(view);
        info!("installed view {}", view);
        *current = Some(view.clone());

        Ok(ViewChange { view, joined, left })
    }

    /// Returns the last installed view, `None` until the first install
    pub fn current(&self) -> Option<Arc<View>> {
        self.current.read().clone()
    }

    pub fn view_id(&self) -> Option<ViewId> {
        self.current.read().as_ref().map(|view| view.id())
    }

    pub fn is_connected(&self) -> bool {
        self.current.read().is_some()
    }

    pub fn contains(&self, member: &Member) -> bool {
        self.current
            .read()
            .as_ref()
            .map(|view| view.contains(member))
            .unwrap_or(false)
    }

    pub fn is_coordinator(&self, member: &Member) -> bool {
        self.current
            .read()
            .as_ref()
            .and_then(|view| view.coordinator().copied())
            .map(|coordinator| coordinator == *member)
            .unwrap_or(false)
    }
}

impl Default for MembershipView {
    fn default() -> Self {
        Self::new()
    }
}
