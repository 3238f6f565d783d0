pub mod config;
pub mod duplex;
pub mod transport;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] config::ConfigError),

    #[error(transparent)]
    Transport(#[from] transport::TransportError),

    #[error(transparent)]
    Duplex(#[from] duplex::DuplexError),
}
