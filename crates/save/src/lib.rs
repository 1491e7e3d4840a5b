mod atomic_write;
pub mod brake_snapshot;
pub mod file_header;
mod save_error;
mod save_plugin;
pub mod saveable_ext;
pub mod session;

#[cfg(test)]
mod plugin_tests;

pub use atomic_write::atomic_write;
pub use save_error::SaveError;
pub use save_plugin::{
    LoadBrakeSnapshotEvent, LoadSessionEvent, SaveBrakeSnapshotEvent, SaveOperation,
    SaveOutcomeEvent, SavePlugin, SaveSessionEvent,
};
pub use saveable_ext::SaveableAppExt;
