//! Argument handling for the `parley-server` and `parley-client` binaries.

use parley::DEFAULT_BIND_ADDR;

/// A command line that couldn't be understood.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum UsageError {
    #[error("missing {0}")]
    Missing(&'static str),

    #[error("invalid port {0:?}")]
    InvalidPort(String),

    #[error("unexpected argument {0:?}")]
    Unexpected(String),
}

/// Settings for `parley-server [PORT|ADDR] [--websocket]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerArgs {
    /// Address to listen on.
    pub addr: String,
    /// Accept WebSocket clients instead of raw TCP.
    pub websocket: bool,
}

impl ServerArgs {
    pub const USAGE: &'static str = "usage: parley-server [PORT|ADDR] [--websocket]";

    /// Parses the arguments after the program name.
    ///
    /// A bare number is a port on all interfaces; anything else is taken
    /// as a full address.
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut addr = None;
        let mut websocket = false;

        for arg in args {
            match arg.as_str() {
                "--websocket" => websocket = true,
                _ if arg.starts_with("--") || addr.is_some() => {
                    return Err(UsageError::Unexpected(arg));
                }
                _ => {
                    addr = Some(match arg.parse::<u16>() {
                        Ok(port) => format!("0.0.0.0:{port}"),
                        Err(_) => arg,
                    });
                }
            }
        }

        Ok(Self {
            addr: addr.unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string()),
            websocket,
        })
    }
}

/// Settings for `parley-client HOST PORT [--json]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientArgs {
    /// `host:port` of the server.
    pub addr: String,
    /// Print server messages as JSON instead of sentences.
    pub json: bool,
}

impl ClientArgs {
    pub const USAGE: &'static str = "usage: parley-client HOST PORT [--json]";

    /// Parses the arguments after the program name.
    pub fn parse<I>(args: I) -> Result<Self, UsageError>
    where
        I: IntoIterator<Item = String>,
    {
        let mut positional = Vec::new();
        let mut json = false;

        for arg in args {
            match arg.as_str() {
                "--json" => json = true,
                _ if arg.starts_with("--") => return Err(UsageError::Unexpected(arg)),
                _ => positional.push(arg),
            }
        }

        let mut positional = positional.into_iter();
        let host = positional.next().ok_or(UsageError::Missing("HOST"))?;
        let port = positional.next().ok_or(UsageError::Missing("PORT"))?;
        if let Some(extra) = positional.next() {
            return Err(UsageError::Unexpected(extra));
        }
        let port: u16 = port.parse().map_err(|_| UsageError::InvalidPort(port))?;

        Ok(Self {
            addr: format!("{host}:{port}"),
            json,
        })
    }
}
