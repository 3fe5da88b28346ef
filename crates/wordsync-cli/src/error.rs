use std::io;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] wordsync_core::Error),
    #[error(transparent)]
    Config(#[from] wordsync_core::ConfigError),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Refusing to erase the store without --yes")]
    EraseNotConfirmed,
    #[error("Device id cannot be empty")]
    EmptyDeviceId,
}
