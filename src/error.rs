use std::net::SocketAddr;

/// Errors that can occur while talking to the vision server.
#[derive(Debug, thiserror::Error)]
pub enum VisionError {
    #[error("Connect to {addr} failed: {source}")]
    Connect {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Timeout waiting for server response")]
    Timeout,

    #[error("Connection closed by server")]
    ConnectionClosed,

    #[error("Not connected")]
    NotConnected,

    #[error("Cannot resolve server address: {0}")]
    AddressResolution(String),

    #[error("Malformed datagram: {0}")]
    Parse(#[from] ParseError),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Failed to spawn thread: {0}")]
    ThreadSpawn(String),
}

impl VisionError {
    /// Map an I/O error from a socket with a read/write timeout set.
    ///
    /// Depending on the platform an expired timeout surfaces as either
    /// `WouldBlock` or `TimedOut`.
    pub(crate) fn from_socket(err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => VisionError::Timeout,
            _ => VisionError::Io(err),
        }
    }
}

/// Reasons a legacy datagram line is rejected.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("empty datagram")]
    Empty,

    #[error("empty field delimiter")]
    EmptyDelimiter,

    #[error("expected at least 3 fields, found {found}")]
    TooFewFields { found: usize },

    #[error("field {index} is not a number: {token:?}")]
    InvalidNumber { index: usize, token: String },
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Error, ErrorKind};

    #[test]
    fn test_socket_timeout_kinds_map_to_timeout() {
        assert!(matches!(
            VisionError::from_socket(Error::from(ErrorKind::WouldBlock)),
            VisionError::Timeout
        ));
        assert!(matches!(
            VisionError::from_socket(Error::from(ErrorKind::TimedOut)),
            VisionError::Timeout
        ));
        assert!(matches!(
            VisionError::from_socket(Error::from(ErrorKind::ConnectionReset)),
            VisionError::Io(_)
        ));
    }

    #[test]
    fn test_parse_error_message() {
        let err = VisionError::from(ParseError::TooFewFields { found: 2 });
        assert_eq!(
            err.to_string(),
            "Malformed datagram: expected at least 3 fields, found 2"
        );
    }
}
