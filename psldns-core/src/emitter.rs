//! Emitter: serializes compiled [`RRsets`] under a provider profile (spec §4.5, §6).

use serde::Serialize;

use crate::compiler::{RRType, RRsets};

/// Default TTL (seconds) used by the reference ("deSEC") provider profile.
pub const DEFAULT_TTL: u32 = 86400;

/// Default zone apex used by the reference provider profile.
pub const DEFAULT_ZONE: &str = "query.publicsuffix.zone";

/// A provider profile: how CNAME/PTR/TXT rdata gets formatted for submission, and under
/// which TTL/zone. Stateless and total; implementations must not reorder or drop records.
pub trait Provider {
    fn ttl(&self) -> u32;
    fn zone(&self) -> &str;

    /// Formats a CNAME target: appends the zone, then a trailing dot.
    fn format_cname(&self, target: &str) -> String {
        format!("{}.{}.", target, self.zone())
    }

    /// Formats a PTR target: a trailing dot only, no zone suffix.
    fn format_ptr(&self, target: &str) -> String {
        format!("{}.", target)
    }

    /// Formats a TXT datum: preserved verbatim, already quoted by the Compiler.
    fn format_txt(&self, datum: &str) -> String {
        datum.to_string()
    }
}

/// The reference deSEC provider profile.
pub struct DesecProvider {
    ttl: u32,
    zone: String,
}

impl DesecProvider {
    pub fn new(zone: impl Into<String>, ttl: u32) -> Self {
        DesecProvider { ttl, zone: zone.into() }
    }
}

impl Default for DesecProvider {
    fn default() -> Self {
        DesecProvider::new(DEFAULT_ZONE, DEFAULT_TTL)
    }
}

impl Provider for DesecProvider {
    fn ttl(&self) -> u32 {
        self.ttl
    }

    fn zone(&self) -> &str {
        &self.zone
    }
}

/// One emitted zone record, matching the reference JSON shape `{subname, ttl, type, records}`.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ZoneRecord {
    pub subname: String,
    pub ttl: u32,
    #[serde(rename = "type")]
    pub rtype: &'static str,
    pub records: Vec<String>,
}

fn rtype_name(rtype: RRType) -> &'static str {
    match rtype {
        RRType::Ptr => "PTR",
        RRType::Cname => "CNAME",
        RRType::Txt => "TXT",
    }
}

/// Serializes `rrsets` under `provider`, in owner order (the iteration order of the
/// underlying `BTreeMap`, which is deterministic but carries no other significance).
pub fn emit(rrsets: &RRsets, provider: &impl Provider) -> Vec<ZoneRecord> {
    let mut out = Vec::new();

    for (owner, rrset_list) in rrsets {
        for rrset in rrset_list {
            let records = rrset
                .records
                .iter()
                .map(|record| match rrset.rtype {
                    RRType::Cname => provider.format_cname(record),
                    RRType::Ptr => provider.format_ptr(record),
                    RRType::Txt => provider.format_txt(record),
                })
                .collect();

            out.push(ZoneRecord {
                subname: owner.clone(),
                ttl: provider.ttl(),
                rtype: rtype_name(rrset.rtype),
                records,
            });
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use std::io::Cursor;

    #[test]
    fn cname_gets_zone_suffix_and_trailing_dot() {
        let mut compiler = Compiler::new();
        compiler.process(Cursor::new(b"eu-west-1.amazonaws.com\n" as &[u8])).unwrap();
        let rrsets = compiler.compile(0).unwrap();
        let provider = DesecProvider::default();
        let records = emit(&rrsets, &provider);

        let cname = records
            .iter()
            .find(|r| r.subname == "com" && r.rtype == "CNAME")
            .expect("expected a CNAME record at com");
        assert_eq!(cname.records, vec!["*.query.publicsuffix.zone.".to_string()]);
    }

    #[test]
    fn ptr_gets_trailing_dot_only() {
        let mut compiler = Compiler::new();
        compiler.process(Cursor::new(b"com\n" as &[u8])).unwrap();
        let rrsets = compiler.compile(0).unwrap();
        let provider = DesecProvider::default();
        let records = emit(&rrsets, &provider);

        let ptr = records.iter().find(|r| r.subname == "com" && r.rtype == "PTR").unwrap();
        assert_eq!(ptr.records, vec!["com.".to_string()]);
    }

    #[test]
    fn txt_is_preserved_verbatim() {
        let mut compiler = Compiler::new();
        compiler.process(Cursor::new(b"com\n" as &[u8])).unwrap();
        let checksum = compiler.checksum();
        let rrsets = compiler.compile(42).unwrap();
        let provider = DesecProvider::default();
        let records = emit(&rrsets, &provider);

        let apex = records.iter().find(|r| r.subname.is_empty() && r.rtype == "TXT").unwrap();
        assert_eq!(apex.records, vec![format!("\"42 {}\"", checksum)]);
    }
}
