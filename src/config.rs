use serde::{Deserialize, Serialize};

/// Length of the dispute window in logical ticks unless configured otherwise.
pub const DEFAULT_DISPUTE_WINDOW: u64 = 10;

/// Parameters fixed for the lifetime of a [crate::ChannelManager].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManagerConfig {
    /// Ticks between the first accepted settlement and the earliest
    /// withdrawal. Later settlements do not extend it.
    pub dispute_window: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("dispute window must be at least one tick")]
    EmptyDisputeWindow,
}

impl Default for ManagerConfig {
    fn default() -> Self {
        Self {
            dispute_window: DEFAULT_DISPUTE_WINDOW,
        }
    }
}

impl ManagerConfig {
    pub fn with_dispute_window(mut self, ticks: u64) -> Self {
        self.dispute_window = ticks;
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.dispute_window == 0 {
            return Err(ConfigError::EmptyDisputeWindow);
        }
        Ok(())
    }
}
