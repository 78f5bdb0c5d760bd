//! Custom error type definitions.

use thiserror::Error;

/// Errors that may arise during parsing.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("Invalid opcode: valid are 0 to 2 and 4 to 6, got {0}.")]
    InvalidOpcode(u8),

    #[error("Invalid rcode: valid are 0 to 11 and 16 to 23, got {0}.")]
    InvalidRcode(u16),

    #[error("Invalid class: valid are 1, 3, 4, 254 or 255, got {0}.")]
    InvalidClass(u16),

    #[error("Invalid name length: must be smaller than 255, is {0}.")]
    NameTooLong(usize),

    #[error("Invalid label length in name: must be smaller than 64, is {0}.")]
    LabelTooLong(usize),

    #[error("Invalid name: labels must contain only a-z, A-Z, 0-9, underscores, and hyphens, and must not start or end with a hyphen.")]
    NameInvalidChars,

    #[error("Invalid name: contains an empty label.")]
    EmptyLabel,

    #[error("Invalid label type: must be 192 (i.e. extended) or 0, is {0}.")]
    InvalidLabelType(u8),

    #[error("Received truncated message: if possible, resend query via TCP.")]
    TruncatedMessage,

    #[error("Encountered name compression where it is explicitly prohibited.")]
    CompressionProhibited,

    #[error("Non-ASCII string in message: {0}.")]
    NonAsciiString(String),

    #[error("IO error.")]
    IoError(#[from] std::io::Error),
}

/// Errors that may arise during encoding.
#[derive(Debug, Error)]
pub enum EncodeError {
    #[error("Domain name too long: allowed are up to 255 bytes, got {0}.")]
    DomainTooLong(usize),

    #[error("Label too long: allowed are up to 63 bytes, got {0}.")]
    LabelTooLong(usize),

    #[error("AA or RA flag set in a query.")]
    AaOrRaInQuery,

    #[error("Tried to encode non-ASCII string: {0}.")]
    NonAsciiString(String),

    #[error("IO error.")]
    IoError(#[from] std::io::Error),
}
