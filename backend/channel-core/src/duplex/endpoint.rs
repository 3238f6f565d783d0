use crate::config::ChannelConfig;
use crate::error::duplex::DuplexError;

use common::ErrorLocation;

use std::panic::Location;

use url::Url;

/// Resolve the WebSocket URL for the duplex service.
///
/// An explicit `duplex_url` wins. Otherwise the service origin is reused with
/// `http` upgraded to `ws` and `https` to `wss`, and the path replaced by
/// `duplex_path`.
pub fn duplex_url(config: &ChannelConfig) -> Result<Url, DuplexError> {
    if let Some(ref explicit) = config.duplex_url {
        return Ok(Url::parse(explicit)?);
    }

    let mut url = Url::parse(&config.base_url)?;

    let scheme = match url.scheme() {
        "http" => "ws",
        "https" => "wss",
        other => {
            return Err(DuplexError::Url {
                message: format!("Cannot derive duplex URL from '{other}' origin"),
                location: ErrorLocation::from(Location::caller()),
            });
        }
    };

    url.set_scheme(scheme).map_err(|_| DuplexError::Url {
        message: format!("Failed to switch {} to {scheme}", config.base_url),
        location: ErrorLocation::from(Location::caller()),
    })?;
    url.set_path(&config.duplex_path);
    url.set_query(None);
    url.set_fragment(None);

    Ok(url)
}
