//! Handshake negotiation.

use super::{Command, ProtocolError, SUPPORTED_PROTOCOLS};

/// Check the first command of a connection.
///
/// Returns the protocol both sides speak, or the reason the client must be
/// disconnected.
pub fn negotiate(command: &Command) -> Result<&'static str, ProtocolError> {
    let Command::Hello { protocols } = command else {
        return Err(ProtocolError::UnexpectedCommand(command.name().to_string()));
    };

    SUPPORTED_PROTOCOLS
        .iter()
        .copied()
        .find(|supported| protocols.iter().any(|offered| offered == supported))
        .ok_or_else(|| ProtocolError::UnsupportedProtocol(protocols.clone()))
}
