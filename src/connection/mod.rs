//! Publisher connection settings
//!
//! # Main Types
//!
//! - [`ConnectionTarget`] - Parsed `server=host[:port]` connection string
//! - [`KeyValuePairs`] - Generic parameter map used by the parser
//!
//! # Recognized Keys
//!
//! | Key           | Meaning                                | Default |
//! |---------------|----------------------------------------|---------|
//! | `server`      | `host[:port]` of the publisher         | required|
//! | `dataChannel` | UDP port, or `{port=...}` block        | none    |
//! | `compression` | request payload compression            | `true`  |

pub mod key_value;

pub use key_value::{parse_key_value_pairs, KeyValuePairs};

use crate::error::{GridLinesError, Result};

/// Port used when the server parameter does not carry one
pub const DEFAULT_PORT: u16 = 7165;

/// Where and how to reach the publisher
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionTarget {
    pub hostname: String,
    pub port: u16,
    /// UDP data channel port, when requested
    pub data_channel: Option<u16>,
    pub compression: bool,
    /// Every parameter from the original string
    pub parameters: KeyValuePairs,
}

impl ConnectionTarget {
    /// Parse a connection string such as `server=localhost:7165;dataChannel=9191`
    pub fn parse(connection_string: &str) -> Result<Self> {
        let parameters = parse_key_value_pairs(connection_string)?;

        let server = parameters
            .get("server")
            .ok_or_else(|| GridLinesError::MissingParameter("server".to_string()))?
            .trim();

        let (hostname, port) = split_host_port(server);
        if hostname.is_empty() {
            return Err(GridLinesError::ConnectionString(
                "server parameter has an empty host name".to_string(),
            ));
        }

        let hostname = hostname.to_string();
        let data_channel = parameters.get("dataChannel").and_then(parse_data_channel);
        let compression = parameters.get_bool("compression").unwrap_or(true);

        Ok(Self {
            hostname,
            port,
            data_channel,
            compression,
            parameters,
        })
    }

    /// `host:port` form, bracketing IPv6 literals
    pub fn address(&self) -> String {
        if self.hostname.contains(':') {
            format!("[{}]:{}", self.hostname, self.port)
        } else {
            format!("{}:{}", self.hostname, self.port)
        }
    }
}

impl std::fmt::Display for ConnectionTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.address())?;
        if let Some(port) = self.data_channel {
            write!(f, " (udp {})", port)?;
        }
        Ok(())
    }
}

/// Split `host[:port]`; an absent or unparsable port falls back to the default
fn split_host_port(server: &str) -> (&str, u16) {
    // [ipv6]:port
    if let Some(rest) = server.strip_prefix('[') {
        if let Some((host, tail)) = rest.split_once(']') {
            let port = tail
                .strip_prefix(':')
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(DEFAULT_PORT);
            return (host.trim(), port);
        }
    }

    // A bare IPv6 literal has more than one colon and no port
    if server.matches(':').count() > 1 {
        return (server, DEFAULT_PORT);
    }

    match server.rsplit_once(':') {
        Some((host, port)) => (host.trim(), port.trim().parse().unwrap_or(DEFAULT_PORT)),
        None => (server, DEFAULT_PORT),
    }
}

fn parse_data_channel(value: &str) -> Option<u16> {
    let value = value.trim();
    if let Ok(port) = value.parse() {
        return Some(port);
    }
    parse_key_value_pairs(value).ok()?.get_parsed("port")
}
