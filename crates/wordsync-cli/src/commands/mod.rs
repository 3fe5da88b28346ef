pub mod apply;
pub mod cleanup;
pub mod common;
pub mod devices;
pub mod erase;
pub mod export;
pub mod log;
pub mod status;
