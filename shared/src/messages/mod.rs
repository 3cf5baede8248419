mod error;
pub use error::WireError;

mod packet;
pub use packet::{Envelope, Packet, RemoteOutcome};

mod request;
pub use request::{RequestId, RequestIdGenerator};

mod response;
pub use response::{ResponseMode, ResponseOutcome, ResponseSet};
