use std::path::Path;

use wordsync_core::db::{DeviceRepository, SqliteDeviceRepository};

use crate::commands::common::{device_to_list_item, format_device_lines, open_database, DeviceListItem};
use crate::error::CliError;

pub fn run_devices(as_json: bool, db_path: &Path) -> Result<(), CliError> {
    let db = open_database(db_path)?;
    let reader = db.reader()?;
    let devices = SqliteDeviceRepository::new(&reader).list()?;

    if as_json {
        let items = devices
            .iter()
            .map(device_to_list_item)
            .collect::<Vec<DeviceListItem>>();
        println!("{}", serde_json::to_string_pretty(&items)?);
    } else if devices.is_empty() {
        println!("No devices have synced yet.");
    } else {
        for line in format_device_lines(&devices) {
            println!("{line}");
        }
    }

    Ok(())
}
