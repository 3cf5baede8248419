use std::default::Default;

use cohort_shared::DeliveryConfig;

use crate::dispatcher::DispatcherConfig;

/// Contains Config properties which will be used by the Node
#[derive(Clone, Debug, Default)]
pub struct NodeConfig {
    /// Used to configure ordering, buffering and retransmission
    pub delivery: DeliveryConfig,
    /// Used to configure call timeouts and the sweeper
    pub dispatcher: DispatcherConfig,
}
