use thiserror::Error;

use crate::types::ViewId;

/// Errors that can occur while installing a view
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MembershipError {
    /// A view with an id lower than or equal to the installed one arrived late
    #[error("Stale view {proposed} rejected, view {current} is already installed")]
    StaleView { current: ViewId, proposed: ViewId },

    /// A view without members cannot be installed while connected
    #[error("View {view_id} has no members. A connected node always has a coordinator")]
    EmptyView { view_id: ViewId },
}
