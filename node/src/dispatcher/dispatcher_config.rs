use std::{default::Default, time::Duration};

use cohort_shared::ResponseMode;

/// Contains Config properties which will be used by the Dispatcher
#[derive(Clone, Debug)]
pub struct DispatcherConfig {
    /// Timeout of calls that do not name one
    pub default_timeout: Duration,
    /// How often the sweeper expires overdue calls and repeats
    /// retransmission requests
    pub sweep_interval: Duration,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(5),
            sweep_interval: Duration::from_millis(50),
        }
    }
}

/// Per-call settings
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CallOptions {
    pub mode: ResponseMode,
    /// Falls back to `DispatcherConfig::default_timeout` when unset
    pub timeout: Option<Duration>,
}

impl CallOptions {
    pub fn new(mode: ResponseMode) -> Self {
        Self {
            mode,
            timeout: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}
