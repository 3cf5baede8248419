mod error;
pub use error::MembershipError;

mod view;
pub use view::{View, ViewChange};

mod membership_view;
pub use membership_view::MembershipView;
