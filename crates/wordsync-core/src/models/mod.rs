//! Data models for Wordsync

mod device;
mod mutation;
mod sync_log;
mod word;

pub use device::{default_device_name, Device, DeviceSummary};
pub use mutation::WordMutation;
pub use sync_log::{SyncLogEntry, SYNC_ACTION};
pub use word::{NewWord, SyncStatus, WordId, WordPayload, WordRecord, DEFAULT_CATEGORY};
