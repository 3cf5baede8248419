use std::{default::Default, time::Duration};

/// Contains Config properties which will be used by the DeliveryEngine
#[derive(Clone, Debug)]
pub struct DeliveryConfig {
    /// Minimum time between two retransmission requests for the same stream
    pub retransmit_interval: Duration,
    /// Maximum number of out-of-order messages buffered per inbound stream
    pub max_buffered_per_sender: usize,
    /// Number of sent messages kept per outbound stream to answer
    /// retransmission requests
    pub retransmit_log_capacity: usize,
}

impl Default for DeliveryConfig {
    fn default() -> Self {
        Self {
            retransmit_interval: Duration::from_millis(100),
            max_buffered_per_sender: 4096,
            retransmit_log_capacity: 8192,
        }
    }
}
