//! Checker: re-parses a PSL source file and verifies every rule round-trips through a
//! running zone (spec §4.8).

use std::collections::HashSet;
use std::io::BufRead;

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

use crate::client::{Client, Transport};
use crate::error::PslError;
use crate::idna;
use crate::rule::lex;

/// One rule whose zone answer disagreed with the rule itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inconsistency {
    pub rule: String,
    pub rules_in_zone: HashSet<String>,
}

/// Streams a PSL source through a live [`Client`], comparing each rule against what the
/// zone actually answers for it, and independently re-derives the checksum the Compiler
/// would have produced for the same source.
pub struct Checker<T: Transport> {
    client: Client<T>,
    hasher: Sha256,
    pub checked: u64,
    pub errors: Vec<Inconsistency>,
}

impl<T: Transport> Checker<T> {
    pub fn new(client: Client<T>) -> Self {
        Checker { client, hasher: Sha256::new(), checked: 0, errors: Vec::new() }
    }

    /// Feeds every line of `reader` through [`Self::process_line`].
    pub fn process<R: BufRead>(&mut self, mut reader: R) -> Result<(), PslError> {
        let mut buf = Vec::new();
        loop {
            buf.clear();
            let read = reader.read_until(b'\n', &mut buf)?;
            if read == 0 {
                break;
            }
            let line = String::from_utf8(buf.clone())
                .map_err(|e| PslError::InternalError(e.to_string()))?;
            self.process_line(&line)?;
        }
        Ok(())
    }

    /// Feeds the running checksum with `line`, and if it holds a rule, checks it against
    /// the zone. Returns `Ok(None)` for blank/comment lines, `Ok(Some(in_sync))` otherwise.
    pub fn process_line(&mut self, line: &str) -> Result<Option<bool>, PslError> {
        self.hasher.update(line.as_bytes());

        let rule = match lex(line) {
            Some(rule) => rule,
            None => return Ok(None),
        };
        self.checked += 1;

        let body = rule.strip_prefix('!').unwrap_or(&rule);
        let ascii_body = idna::domain_to_ascii(body)?;
        let rules_in_zone = self.client.get_rules(&ascii_body)?;

        let in_sync = rules_in_zone.contains(&rule);
        if in_sync {
            log::debug!("{} is in sync with the zone", rule);
        } else {
            log::info!("{} maps to {:?} in the zone", rule, rules_in_zone);
            self.errors.push(Inconsistency { rule, rules_in_zone });
        }

        Ok(Some(in_sync))
    }

    /// Compares the locally streamed checksum against the zone's apex TXT checksum.
    pub fn verify_checksum(&self) -> Result<bool, PslError> {
        let local = HEXLOWER.encode(&self.hasher.clone().finalize());
        match self.client.get_checksum()? {
            Some(remote) => {
                let matches = local == remote;
                if !matches {
                    log::warn!("checksum mismatch: local {} != zone {}", local, remote);
                }
                Ok(matches)
            }
            None => {
                log::warn!("zone has no checksum to compare against");
                Ok(false)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::Client;
    use crate::compiler::Compiler;
    use crate::emitter::{emit, DesecProvider};
    use psldns_proto::{HeaderFlags, Message, Name, Opcode, RecordType};
    use std::io::Cursor as IoCursor;

    /// A bare-bones in-memory [`Transport`] that answers with a zone's exact-owner records
    /// only; sufficient to exercise [`Checker`] against inputs whose rules never need
    /// wildcard synthesis (exceptions and inline-wildcards have real owners of their own).
    struct DirectTransport {
        zone: Name,
        records: Vec<(Name, RecordType, psldns_proto::Rdata)>,
    }

    impl DirectTransport {
        fn from_psl(psl: &str, zone: &str) -> Self {
            let mut compiler = Compiler::new();
            compiler.process(IoCursor::new(psl.as_bytes())).unwrap();
            let rrsets = compiler.compile(1_700_000_000).unwrap();
            let provider = DesecProvider::new(zone, 3600);
            let zone_name = Name::from_ascii(zone).unwrap();

            let mut records = Vec::new();
            for record in emit(&rrsets, &provider) {
                let owner_str = if record.subname.is_empty() {
                    zone.to_string()
                } else {
                    format!("{}.{}", record.subname, zone)
                };
                let owner = Name::from_ascii(&owner_str).unwrap();
                let rtype = match record.rtype {
                    "PTR" => RecordType::PTR,
                    "CNAME" => RecordType::CNAME,
                    "TXT" => RecordType::TXT,
                    other => panic!("unexpected rtype {other}"),
                };
                for value in record.records {
                    let rdata = match rtype {
                        RecordType::PTR => psldns_proto::Rdata::PTR(psldns_proto::rdata::PTR {
                            location: Name::from_ascii(value.trim_end_matches('.')).unwrap(),
                        }),
                        RecordType::CNAME => psldns_proto::Rdata::CNAME(psldns_proto::rdata::CNAME {
                            cname: Name::from_ascii(value.trim_end_matches('.')).unwrap(),
                        }),
                        RecordType::TXT => {
                            psldns_proto::Rdata::TXT(psldns_proto::rdata::TXT { text: vec![value] })
                        }
                        _ => unreachable!(),
                    };
                    records.push((owner.clone(), rtype, rdata));
                }
            }

            DirectTransport { zone: zone_name, records }
        }
    }

    impl Transport for &'_ DirectTransport {
        fn query(&mut self, qname: &Name, qtype: RecordType) -> Result<Message, PslError> {
            let flags = HeaderFlags { aa: false, tc: false, rd: false, ra: false, ad: false, cd: false };
            let mut msg = Message::new_query(qname.clone(), qtype, Opcode::QUERY, flags)
                .map_err(|_| PslError::InternalError("mock query build".to_string()))?;
            msg.header.qr = true;

            for (owner, rtype, rdata) in &self.records {
                if owner == qname && *rtype == qtype {
                    let record =
                        psldns_proto::Record::new(owner.clone(), psldns_proto::Class::IN, 3600, rdata.clone())
                            .map_err(|_| PslError::InternalError("mock record build".to_string()))?;
                    msg.answers.push(record);
                }
            }
            let _ = &self.zone;
            Ok(msg)
        }
    }

    #[test]
    fn process_line_flags_an_inconsistent_rule() {
        let transport = DirectTransport::from_psl("ck\n*.ck\n!www.ck\n", "query.publicsuffix.zone");
        let client = Client::new(&transport, "query.publicsuffix.zone").unwrap();
        let mut checker = Checker::new(client);

        let in_sync = checker.process_line("!www.ck\n").unwrap().unwrap();
        assert!(in_sync);
        assert!(checker.errors.is_empty());

        let in_sync = checker.process_line("!nope.ck\n").unwrap().unwrap();
        assert!(!in_sync);
        assert_eq!(checker.errors.len(), 1);
        assert_eq!(checker.errors[0].rule, "!nope.ck");
    }

    #[test]
    fn process_line_skips_comments_and_blanks() {
        let transport = DirectTransport::from_psl("com\n", "query.publicsuffix.zone");
        let client = Client::new(&transport, "query.publicsuffix.zone").unwrap();
        let mut checker = Checker::new(client);

        assert_eq!(checker.process_line("// comment\n").unwrap(), None);
        assert_eq!(checker.process_line("\n").unwrap(), None);
        assert_eq!(checker.checked, 0);
    }

    #[test]
    fn verify_checksum_matches_local_hash() {
        let psl = "com\nco.uk\n";
        let mut compiler = Compiler::new();
        compiler.process(IoCursor::new(psl.as_bytes())).unwrap();
        let expected_checksum = compiler.checksum();

        let transport = DirectTransport::from_psl(psl, "query.publicsuffix.zone");
        let client = Client::new(&transport, "query.publicsuffix.zone").unwrap();
        let mut checker = Checker::new(client);
        checker.process(IoCursor::new(psl.as_bytes())).unwrap();

        assert_eq!(checker.verify_checksum().unwrap(), true);
        assert_eq!(HEXLOWER.encode(&checker.hasher.clone().finalize()), expected_checksum);
    }
}
