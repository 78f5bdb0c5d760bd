//! Client/Decoder: issues PTR/TXT queries against a compiled zone and reconstructs PSL
//! answers from the DNS RRsets the Emitter produced (spec §4.7).
//!
//! The transport this implementation picked is plain TCP, length-prefixed per
//! [RFC 1035 §4.2.2](https://www.rfc-editor.org/rfc/rfc1035#section-4.2.2): every query and
//! response is framed with a 2-byte big-endian length, the same framing
//! [`psldns_proto::Message`] itself stays agnostic of.

use std::collections::{HashMap, HashSet};
use std::io::{Cursor, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::sync::Mutex;
use std::time::Duration;

use psldns_proto::{HeaderFlags, Message, Name, Opcode, RecordType};

use crate::error::PslError;
use crate::idna;

/// Default per-query timeout (spec §7).
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// A CNAME chain longer than this is treated as a resolver error rather than followed
/// forever; matches the bound the original querier used for the same purpose.
const MAX_CNAME_CHAIN: usize = 16;

/// How a [`Client`] sends a query [`Message`] and gets an answer [`Message`] back.
pub trait Transport {
    fn query(&mut self, qname: &Name, qtype: RecordType) -> Result<Message, PslError>;
}

/// Queries over plain TCP against a single configured resolver.
pub struct TcpTransport {
    resolver: String,
    timeout: Duration,
}

impl TcpTransport {
    pub fn new(resolver: impl Into<String>, timeout: Duration) -> Self {
        TcpTransport { resolver: resolver.into(), timeout }
    }
}

impl Transport for TcpTransport {
    fn query(&mut self, qname: &Name, qtype: RecordType) -> Result<Message, PslError> {
        let flags = HeaderFlags { aa: false, tc: false, rd: true, ra: false, ad: false, cd: false };
        let query = Message::new_query(qname.clone(), qtype, Opcode::QUERY, flags)?;
        let encoded = query.encode()?;

        let addr = (self.resolver.as_str(), 53)
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| PslError::ResolverError(format!("could not resolve {}", self.resolver)))?;

        let mut stream = TcpStream::connect_timeout(&addr, self.timeout)?;
        stream.set_read_timeout(Some(self.timeout))?;
        stream.set_write_timeout(Some(self.timeout))?;

        let mut framed = Vec::with_capacity(encoded.len() + 2);
        framed.extend_from_slice(&(encoded.len() as u16).to_be_bytes());
        framed.extend_from_slice(&encoded);
        stream.write_all(&framed)?;

        let mut len_buf = [0u8; 2];
        stream.read_exact(&mut len_buf)?;
        let len = u16::from_be_bytes(len_buf) as usize;
        let mut buf = vec![0u8; len];
        stream.read_exact(&mut buf)?;

        Ok(Message::parse(&mut Cursor::new(&buf))?)
    }
}

fn unquote(s: &str) -> &str {
    s.strip_prefix('"').and_then(|s| s.strip_suffix('"')).unwrap_or(s)
}

struct NormalizedDomain {
    ascii: String,
    had_trailing_dot: bool,
    is_ascii_input: bool,
}

fn normalize_domain(domain: &str) -> Result<NormalizedDomain, PslError> {
    if domain.is_empty() || domain.starts_with('.') {
        return Err(PslError::InvalidDomain(domain.to_string()));
    }

    let had_trailing_dot = domain != "." && domain.ends_with('.');
    let body = domain.strip_suffix('.').unwrap_or(domain);
    if body.is_empty() {
        return Err(PslError::InvalidDomain(domain.to_string()));
    }

    let lower = body.to_lowercase();
    let ascii = idna::domain_to_ascii(&lower)?;
    let is_ascii_input = lower == ascii;
    Ok(NormalizedDomain { ascii, had_trailing_dot, is_ascii_input })
}

/// Lines up `raw`'s labels against `domain`'s from the right, substituting each `*` label
/// in `raw` with the corresponding label of `domain`. Any other label mismatch means the
/// zone disagrees with the domain it was asked about.
fn substitute_wildcard_labels(raw: &str, domain: &str) -> Result<String, PslError> {
    let mut public_labels: Vec<&str> = raw.split('.').collect();
    let domain_labels: Vec<&str> = domain.split('.').collect();
    let n = public_labels.len();

    for i in 0..n {
        let pub_idx = n - 1 - i;
        let dom_idx = match domain_labels.len().checked_sub(1 + i) {
            Some(idx) => idx,
            None => break,
        };

        if public_labels[pub_idx] == "*" {
            public_labels[pub_idx] = domain_labels[dom_idx];
        } else if public_labels[pub_idx] != domain_labels[dom_idx] {
            return Err(PslError::InconsistentLabel {
                public: public_labels[pub_idx].to_string(),
                domain: domain_labels[dom_idx].to_string(),
            });
        }
    }

    Ok(public_labels.join("."))
}

/// Queries a compiled zone and decodes its answers back into PSL verdicts.
///
/// Caches every `(owner, rdatatype)` query it issues for the lifetime of the `Client`; the
/// cache is never evicted, matching the "won't change out from under a running process"
/// assumption a compiled zone's TTL implies.
pub struct Client<T: Transport> {
    transport: Mutex<T>,
    zone: Name,
    cache: Mutex<HashMap<(String, u16), Message>>,
}

impl<T: Transport> Client<T> {
    pub fn new(transport: T, zone: &str) -> Result<Self, PslError> {
        let zone_name = Name::from_ascii(zone.trim_end_matches('.'))?;
        Ok(Client { transport: Mutex::new(transport), zone: zone_name, cache: Mutex::new(HashMap::new()) })
    }

    fn owner_name(&self, ascii_domain: &str) -> Result<Name, PslError> {
        let mut name = Name::from_ascii(ascii_domain)?;
        name.append_name(self.zone.clone());
        Ok(name)
    }

    fn cached_query(&self, owner: &Name, rtype: RecordType) -> Result<Message, PslError> {
        let key = (owner.to_string(), u16::from(rtype));
        if let Some(msg) = self.cache.lock().unwrap().get(&key) {
            log::debug!("cache hit for {} {}", owner, rtype);
            return Ok(msg.clone());
        }

        log::info!("querying {} {}", owner, rtype);
        let msg = self.transport.lock().unwrap().query(owner, rtype)?;
        self.cache.lock().unwrap().insert(key, msg.clone());
        Ok(msg)
    }

    /// Queries `rtype` at `owner`, following CNAMEs within the answer up to
    /// [`MAX_CNAME_CHAIN`] hops, and returns the matching rdata as strings (PTR targets or
    /// TXT character-strings) if present.
    fn resolve(&self, owner: &Name, rtype: RecordType) -> Result<Option<Vec<String>>, PslError> {
        let msg = self.cached_query(owner, rtype)?;
        let mut current = owner.clone();

        for _ in 0..MAX_CNAME_CHAIN {
            let direct = msg.answers_for(&current, rtype);
            let texts: Vec<String> = match rtype {
                RecordType::PTR => direct
                    .iter()
                    .filter_map(|r| r.rdata().as_ptr())
                    .map(|p| p.location.to_string())
                    .collect(),
                RecordType::TXT => direct
                    .iter()
                    .filter_map(|r| r.rdata().as_txt())
                    .flat_map(|t| t.text.clone())
                    .collect(),
                _ => Vec::new(),
            };
            if !texts.is_empty() {
                return Ok(Some(texts));
            }

            match msg.answers_for(&current, RecordType::CNAME).into_iter().next() {
                Some(record) => {
                    current = record
                        .rdata()
                        .as_cname()
                        .expect("CNAME record type implies CNAME rdata")
                        .cname
                        .clone();
                }
                None => return Ok(None),
            }
        }

        Err(PslError::ResolverError(format!("CNAME chain exceeded {} hops", MAX_CNAME_CHAIN)))
    }

    /// The apex TXT record's checksum field, or `None` if the apex has no TXT record.
    pub fn get_checksum(&self) -> Result<Option<String>, PslError> {
        match self.resolve(&self.zone, RecordType::TXT)? {
            Some(texts) => {
                let checksum = texts
                    .first()
                    .map(|s| unquote(s))
                    .and_then(|s| s.split_whitespace().nth(1))
                    .map(|s| s.to_string());
                Ok(checksum)
            }
            None => Ok(None),
        }
    }

    /// Reconstructs the public suffix of `domain` (spec §4.7): queries PTR at `domain`'s
    /// owner, substitutes any `*` labels in the answer with `domain`'s own labels, and
    /// restores `domain`'s original encoding (Unicode/ASCII, trailing dot).
    pub fn get_public_suffix(&self, domain: &str) -> Result<String, PslError> {
        let norm = normalize_domain(domain)?;
        let owner = self.owner_name(&norm.ascii)?;

        let targets = self
            .resolve(&owner, RecordType::PTR)?
            .ok_or_else(|| PslError::UnsupportedRule(domain.to_string()))?;
        let raw = targets.first().cloned().unwrap_or_default();

        let substituted = substitute_wildcard_labels(&raw, &norm.ascii)?;
        let result =
            if norm.is_ascii_input { substituted } else { idna::domain_to_unicode(&substituted) };

        Ok(if norm.had_trailing_dot { format!("{}.", result) } else { result })
    }

    /// Whether `domain` is itself a public suffix, i.e. has as many labels as its own
    /// public suffix. `suffix`, if given, is used instead of recomputing it.
    pub fn is_public_suffix(&self, domain: &str, suffix: Option<&str>) -> Result<bool, PslError> {
        let computed;
        let suffix = match suffix {
            Some(s) => s,
            None => {
                computed = self.get_public_suffix(domain)?;
                &computed
            }
        };
        Ok(domain.matches('.').count() == suffix.matches('.').count())
    }

    /// The PSL rules that apply at `domain`'s owner: the owner's TXT strings if it has any
    /// (an exception or inline-wildcard owner), otherwise the single raw (unsubstituted)
    /// PTR target governing it, otherwise an empty set if nothing answers for it at all.
    pub fn get_rules(&self, domain: &str) -> Result<HashSet<String>, PslError> {
        let body = domain.strip_suffix('.').unwrap_or(domain).to_lowercase();
        let ascii = idna::domain_to_ascii(&body)?;
        let owner = self.owner_name(&ascii)?;

        if let Some(texts) = self.resolve(&owner, RecordType::TXT)? {
            return Ok(texts.iter().map(|t| idna::decode_rule(unquote(t))).collect());
        }

        match self.resolve(&owner, RecordType::PTR)? {
            Some(targets) => {
                let mut rules = HashSet::new();
                if let Some(first) = targets.first() {
                    rules.insert(idna::decode_rule(first));
                }
                Ok(rules)
            }
            None => Ok(HashSet::new()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compiler::Compiler;
    use crate::emitter::{emit, DesecProvider};
    use std::collections::HashSet;
    use std::io::Cursor as IoCursor;

    /// An in-memory authoritative resolver over a compiled zone: performs exact-owner
    /// lookup, then DNS wildcard matching, then leaves CNAME-chasing to the caller by
    /// returning every relevant record it can find at the queried owner, matching what a
    /// real server would put in a single answer section.
    struct MockTransport {
        zone: Name,
        records: Vec<(Name, RecordType, psldns_proto::Rdata)>,
    }

    impl MockTransport {
        fn from_psl(psl: &str, zone: &str) -> Self {
            let mut compiler = Compiler::new();
            compiler.process(IoCursor::new(psl.as_bytes())).unwrap();
            let rrsets = compiler.compile(1_700_000_000).unwrap();
            let provider = DesecProvider::new(zone, 3600);
            let zone_name = Name::from_ascii(zone).unwrap();

            let mut records = Vec::new();
            for record in emit(&rrsets, &provider) {
                let owner_str =
                    if record.subname.is_empty() { zone.to_string() } else { format!("{}.{}", record.subname, zone) };
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

            MockTransport { zone: zone_name, records }
        }

        /// All records a compliant authoritative server would consider to exist "at"
        /// `name`: its own records if any exist there, else the nearest enclosing
        /// wildcard's (per RFC 4592) as if they were `name`'s own.
        fn effective_records(&self, name: &Name) -> Vec<(RecordType, psldns_proto::Rdata)> {
            let exact: Vec<_> = self
                .records
                .iter()
                .filter(|(owner, _, _)| owner == name)
                .map(|(_, rtype, rdata)| (*rtype, rdata.clone()))
                .collect();
            if !exact.is_empty() {
                return exact;
            }
            if name.label_count() <= self.zone.label_count() {
                return Vec::new();
            }

            let mut parent = name.clone();
            parent.pop_front_label();
            let mut wild = parent;
            wild.prepend_wildcard();

            self.records
                .iter()
                .filter(|(owner, _, _)| owner == &wild)
                .map(|(_, rtype, rdata)| (*rtype, rdata.clone()))
                .collect()
        }
    }

    impl Transport for &'_ MockTransport {
        // Stands in for a recursive resolver: chases CNAMEs itself and returns the whole
        // chain in one answer section, same as a real recursive resolver would hand back
        // to `TcpTransport` in one exchange.
        fn query(&mut self, qname: &Name, qtype: RecordType) -> Result<Message, PslError> {
            let flags = HeaderFlags { aa: false, tc: false, rd: false, ra: false, ad: false, cd: false };
            let mut msg = Message::new_query(qname.clone(), qtype, Opcode::QUERY, flags)
                .map_err(|_| PslError::InternalError("mock query build".to_string()))?;
            msg.header.qr = true;

            let mut current = qname.clone();
            for _ in 0..MAX_CNAME_CHAIN {
                let records = self.effective_records(&current);
                let direct: Vec<_> =
                    records.iter().filter(|(rtype, _)| *rtype == qtype).map(|(_, r)| r.clone()).collect();

                if !direct.is_empty() {
                    for rdata in direct {
                        let record =
                            psldns_proto::Record::new(current.clone(), psldns_proto::Class::IN, 3600, rdata)
                                .map_err(|_| PslError::InternalError("mock record build".to_string()))?;
                        msg.answers.push(record);
                    }
                    break;
                }

                match records.into_iter().find(|(rtype, _)| *rtype == RecordType::CNAME) {
                    Some((_, rdata)) => {
                        let target = rdata.as_cname().unwrap().cname.clone();
                        let record =
                            psldns_proto::Record::new(current.clone(), psldns_proto::Class::IN, 3600, rdata)
                                .map_err(|_| PslError::InternalError("mock record build".to_string()))?;
                        msg.answers.push(record);
                        current = target;
                    }
                    None => break,
                }
            }

            Ok(msg)
        }
    }

    fn client_for(psl: &str) -> Client<&'static MockTransport> {
        let transport: &'static MockTransport =
            Box::leak(Box::new(MockTransport::from_psl(psl, "query.publicsuffix.zone")));
        Client::new(transport, "query.publicsuffix.zone").unwrap()
    }

    #[test]
    fn public_suffix_of_unlisted_tld_is_itself() {
        let client = client_for("com\nco.uk\n");
        assert_eq!(client.get_public_suffix("xyz").unwrap(), "xyz");
    }

    #[test]
    fn public_suffix_of_regular_rule() {
        let client = client_for("com\n");
        assert_eq!(client.get_public_suffix("example.com").unwrap(), "com");
    }

    #[test]
    fn public_suffix_substitutes_proper_wildcard() {
        let client = client_for("ck\n*.ck\n");
        assert_eq!(client.get_public_suffix("foo.ck").unwrap(), "foo.ck");
    }

    #[test]
    fn public_suffix_honors_wildcard_exception() {
        let client = client_for("ck\n*.ck\n!www.ck\n");
        assert_eq!(client.get_public_suffix("www.ck").unwrap(), "ck");
        assert_eq!(client.get_public_suffix("foo.ck").unwrap(), "foo.ck");
    }

    #[test]
    fn public_suffix_rejects_leading_dot() {
        let client = client_for("com\n");
        assert!(matches!(client.get_public_suffix(".com"), Err(PslError::InvalidDomain(_))));
    }

    #[test]
    fn public_suffix_decodes_unicode_input_back_to_unicode() {
        let client = client_for("cn\n");
        assert_eq!(client.get_public_suffix("公司.cn").unwrap(), "cn");
    }

    #[test]
    fn is_public_suffix_true_for_exact_suffix() {
        let client = client_for("ck\n*.ck\n!www.ck\n");
        assert!(client.is_public_suffix("something.ck", None).unwrap());
        assert!(!client.is_public_suffix("www.ck", None).unwrap());
    }

    #[test]
    fn get_checksum_round_trips_compiler_checksum() {
        let mut compiler = Compiler::new();
        compiler.process(IoCursor::new(b"com\n" as &[u8])).unwrap();
        let checksum = compiler.checksum();
        let transport = MockTransport::from_psl("com\n", "query.publicsuffix.zone");
        let client = Client::new(&transport, "query.publicsuffix.zone").unwrap();
        assert_eq!(client.get_checksum().unwrap(), Some(checksum));
    }

    #[test]
    fn get_rules_prefers_txt_over_ptr_at_exception_owner() {
        let client = client_for("ck\n*.ck\n!www.ck\n");
        let rules = client.get_rules("www.ck").unwrap();
        let expected: HashSet<String> =
            ["*.ck".to_string(), "!www.ck".to_string()].into_iter().collect();
        assert_eq!(rules, expected);
    }

    #[test]
    fn get_rules_falls_back_to_raw_ptr_target() {
        let client = client_for("com\n");
        let rules = client.get_rules("com").unwrap();
        assert_eq!(rules, ["com".to_string()].into_iter().collect::<HashSet<_>>());
    }
}
