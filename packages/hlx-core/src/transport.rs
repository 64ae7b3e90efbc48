//! Transport abstraction and peer addressing.
//!
//! The core never owns sockets directly: connections are spawned over any
//! duplex byte stream ([`Stream`]), which in production is a Telnet-style
//! TCP stream (default port 23, no option negotiation) and in tests an
//! in-memory duplex pipe.

use std::fmt;
use std::str::FromStr;

use tokio::io::{AsyncRead, AsyncWrite};

use crate::config::DEFAULT_PORT;
use crate::error::ConnectionError;

/// A duplex byte stream usable as a protocol transport.
pub trait Stream: AsyncRead + AsyncWrite + Unpin + Send {}

impl<T: AsyncRead + AsyncWrite + Unpin + Send> Stream for T {}

/// A parsed peer address: `(scheme, host, port)`.
///
/// Accepted forms: `telnet://host:port`, `telnet://host`, `host:port`,
/// and bare `host`; the port defaults to the Telnet control port.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostAddress {
    /// Hostname or address literal.
    pub host: String,
    /// TCP port.
    pub port: u16,
}

impl HostAddress {
    /// Creates an address from parts.
    #[must_use]
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    /// Formats the address for the socket layer.
    #[must_use]
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl fmt::Display for HostAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "telnet://{}:{}", self.host, self.port)
    }
}

impl FromStr for HostAddress {
    type Err = ConnectionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let rest = match s.split_once("://") {
            Some(("telnet", rest)) => rest,
            Some((scheme, _)) => {
                return Err(ConnectionError::Resolve(format!(
                    "unsupported scheme {scheme:?}"
                )))
            }
            None => s,
        };

        if rest.is_empty() {
            return Err(ConnectionError::Resolve("empty host".to_string()));
        }

        // IPv6 literals carry colons; only split on a port if the colon is
        // outside a bracketed literal.
        if let Some(rest) = rest.strip_prefix('[') {
            let (host, tail) = rest
                .split_once(']')
                .ok_or_else(|| ConnectionError::Resolve(format!("unclosed bracket in {s:?}")))?;
            let port = match tail.strip_prefix(':') {
                Some(port) => port
                    .parse()
                    .map_err(|_| ConnectionError::Resolve(format!("bad port in {s:?}")))?,
                None if tail.is_empty() => DEFAULT_PORT,
                None => {
                    return Err(ConnectionError::Resolve(format!("trailing junk in {s:?}")))
                }
            };
            return Ok(Self::new(host, port));
        }

        match rest.rsplit_once(':') {
            Some((host, port)) if !host.contains(':') => {
                let port = port
                    .parse()
                    .map_err(|_| ConnectionError::Resolve(format!("bad port in {s:?}")))?;
                Ok(Self::new(host, port))
            }
            // More than one colon with no brackets: a bare IPv6 literal.
            _ => Ok(Self::new(rest, DEFAULT_PORT)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_host_gets_default_port() {
        let addr: HostAddress = "hlx.local".parse().unwrap();
        assert_eq!(addr, HostAddress::new("hlx.local", 23));
    }

    #[test]
    fn scheme_and_port_parse() {
        let addr: HostAddress = "telnet://192.168.1.48:2323".parse().unwrap();
        assert_eq!(addr, HostAddress::new("192.168.1.48", 2323));
        assert_eq!(addr.to_string(), "telnet://192.168.1.48:2323");
    }

    #[test]
    fn ipv6_literals_parse() {
        let addr: HostAddress = "[fe80::1]:23".parse().unwrap();
        assert_eq!(addr, HostAddress::new("fe80::1", 23));

        let addr: HostAddress = "fe80::1".parse().unwrap();
        assert_eq!(addr, HostAddress::new("fe80::1", DEFAULT_PORT));

        let addr: HostAddress = "telnet://[::1]".parse().unwrap();
        assert_eq!(addr, HostAddress::new("::1", DEFAULT_PORT));
    }

    #[test]
    fn foreign_schemes_are_rejected() {
        assert!("http://host".parse::<HostAddress>().is_err());
        assert!("".parse::<HostAddress>().is_err());
    }
}
