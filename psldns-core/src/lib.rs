//! `psldns-core` turns a Public Suffix List source file into a DNS zone, and turns DNS
//! answers from that zone back into PSL verdicts.
//!
//! The pipeline has two independent directions:
//!
//! - [`rule`] and [`compiler`]: lex, classify, and compile PSL rules into [`compiler::RRsets`];
//!   [`emitter`] then serializes those under a given DNS provider's record-submission format.
//! - [`client`]: queries a live zone compiled this way and reconstructs the same PTR/TXT-based
//!   answers the Compiler encoded, via any [`client::Transport`].
//!
//! [`checker`] ties both directions together: it replays a PSL source against a live zone and
//! reports where the two disagree.

pub mod checker;
pub mod client;
pub mod compiler;
pub mod emitter;
pub mod error;
pub mod idna;
pub mod rule;

pub use checker::{Checker, Inconsistency};
pub use client::{Client, TcpTransport, Transport, DEFAULT_TIMEOUT};
pub use compiler::{Compiler, RRset, RRsets, RRType};
pub use emitter::{emit, DesecProvider, Provider, ZoneRecord};
pub use error::PslError;
pub use rule::{classify, lex, RuleKind, RuleStore};
