//! Error types raised while lexing, compiling, querying, and checking a PSL zone.

use thiserror::Error;

/// The six error kinds the system distinguishes, with their CLI/Client disposition.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PslError {
    /// Raised by the Client when a queried domain is empty or starts with `.`.
    #[error("invalid domain: {0:?}")]
    InvalidDomain(String),

    /// Raised by the IDNA codec on unencodable input; surfaced at rule-ingestion time.
    #[error("invalid IDNA label: {0:?}")]
    InvalidLabel(String),

    /// Raised by the Client when the authoritative answer is NODATA on PTR, i.e. the
    /// domain falls under an inline-wildcard subtree.
    #[error("domain {0:?} is affected by an unsupported rule")]
    UnsupportedRule(String),

    /// Raised by the Client when wildcard reconstruction finds a non-wildcard label in
    /// the PTR target that disagrees with the queried domain.
    #[error("public suffix label {public:?} inconsistent with domain label {domain:?}")]
    InconsistentLabel { public: String, domain: String },

    /// Raised by the transport: NXDOMAIN, a timeout, or a wire-protocol error.
    #[error("resolver error: {0}")]
    ResolverError(String),

    /// Raised by the Compiler when one of its invariants is violated; fatal.
    #[error("internal compiler error: {0}")]
    InternalError(String),
}

impl From<psldns_proto::error::ParseError> for PslError {
    fn from(err: psldns_proto::error::ParseError) -> Self {
        PslError::ResolverError(err.to_string())
    }
}

impl From<psldns_proto::error::EncodeError> for PslError {
    fn from(err: psldns_proto::error::EncodeError) -> Self {
        PslError::ResolverError(err.to_string())
    }
}

impl From<std::io::Error> for PslError {
    fn from(err: std::io::Error) -> Self {
        PslError::ResolverError(err.to_string())
    }
}
