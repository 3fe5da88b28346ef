//! Device registry model

use serde::{Deserialize, Serialize};

/// A client device that has synced at least once
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Opaque, self-reported client token
    pub device_id: String,
    pub device_name: String,
    pub last_sync: Option<String>,
    pub last_ip: Option<String>,
    pub created_at: String,
}

/// Device row plus derived counts, as listed to operators
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSummary {
    #[serde(flatten)]
    pub device: Device,
    /// Active (non-tombstoned) words originating from this device
    pub word_count: u64,
}

/// Display name used when a device does not report one
#[must_use]
pub fn default_device_name(device_id: &str) -> String {
    let prefix: String = device_id.chars().take(8).collect();
    format!("Device-{prefix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_name_uses_id_prefix() {
        assert_eq!(default_device_name("a1b2c3d4e5f6"), "Device-a1b2c3d4");
        assert_eq!(default_device_name("abc"), "Device-abc");
    }
}
