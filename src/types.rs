// src/types.rs

use serde::Deserialize;

/// `[config].triggered_while_running_behaviour`: what a change does to an
/// instance of the same task that is still building.
///
/// Either way the task runs again afterwards; `cancel` just stops the stale
/// build at its next stage boundary instead of letting it finish.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TriggerWhileRunningBehaviour {
    Queue,
    #[default]
    Cancel,
}

/// Where the image change-skip cache lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CacheStorageMode {
    /// Persist entries in `.assetpipe/images` under the project root.
    #[default]
    File,
    /// Keep entries for the lifetime of the process only.
    Memory,
}
