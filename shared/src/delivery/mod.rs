mod delivery_config;
pub use delivery_config::DeliveryConfig;

mod error;
pub use error::DeliveryError;

mod inbound_stream;
pub use inbound_stream::StreamState;

mod outbound_stream;

mod delivery_engine;
pub use delivery_engine::{DeliveryEngine, Receipt, Retransmission, RetransmitRequest, StreamKey};
