//! Shared scaffolding for the `psldns-parse`/`psldns-check`/`psldns-query` binaries.

pub mod args;
