use serde::{Deserialize, Serialize};

pub const DEFAULT_MAX_BATCH_SETTLE: usize = 20;
pub const DEFAULT_MAX_DOMAIN_LENGTH: usize = 100;

/// Engine-side limits. Host-side settings (dapps, reserved domains, apply
/// limit) live in [`crate::host::DappDirectory`].
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct EngineConfig {
    /// Upper bound on entries in one batch settlement.
    pub max_batch_settle: usize,
    pub max_domain_length: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_batch_settle: DEFAULT_MAX_BATCH_SETTLE,
            max_domain_length: DEFAULT_MAX_DOMAIN_LENGTH,
        }
    }
}
