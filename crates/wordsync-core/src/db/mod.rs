//! Storage layer for Wordsync

mod connection;
mod device_repository;
mod migrations;
mod repository;

pub use connection::{Database, WriteGate};
pub use device_repository::{DeviceRepository, SqliteDeviceRepository};
pub use repository::{SqliteWordRepository, WordRepository};
