//! Zone Compiler: the six-pass pipeline turning PSL rules into DNS RRsets (spec §4.4).

use std::collections::BTreeMap;
use std::io::BufRead;

use data_encoding::HEXLOWER;
use sha2::{Digest, Sha256};

use crate::error::PslError;
use crate::rule::RuleStore;

/// The three RDATA types a compiled zone ever contains.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RRType {
    Ptr,
    Cname,
    Txt,
}

/// A single RRset: one rdata type and its ordered records, at some owner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RRset {
    pub rtype: RRType,
    pub records: Vec<String>,
}

/// Owner name (relative to the zone apex; `""` is the apex) to its RRsets.
///
/// A `BTreeMap` so compiled output iterates in a fixed order regardless of insertion order,
/// which in turn comes from whatever order rules appeared in the source PSL file.
pub type RRsets = BTreeMap<String, Vec<RRset>>;

fn set_rrsets(rrsets: &mut RRsets, owner: &str, entries: Vec<(RRType, Vec<String>)>) {
    rrsets.insert(
        owner.to_string(),
        entries
            .into_iter()
            .map(|(rtype, records)| RRset { rtype, records })
            .collect(),
    );
}

/// Accumulates PSL source lines into a [`RuleStore`] and a streaming checksum, and compiles
/// them into [`RRsets`] on demand.
#[derive(Debug)]
pub struct Compiler {
    rules: RuleStore,
    hasher: Sha256,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        Compiler {
            rules: RuleStore::new(),
            hasher: Sha256::new(),
        }
    }

    /// Reads every line from `reader` via [`Self::add_line`], preserving each line's exact
    /// terminator (or lack thereof on a final partial line) so the checksum matches the raw
    /// input byte stream exactly.
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
            self.add_line(&line)?;
        }
        Ok(())
    }

    /// Feeds the checksum and ingests one source line.
    pub fn add_line(&mut self, line: &str) -> Result<(), PslError> {
        self.hasher.update(line.as_bytes());
        self.rules.ingest(line)?;
        Ok(())
    }

    /// Ingests a rule without feeding the checksum, for rules synthesized after parsing
    /// (e.g. self-test rules appended by a caller).
    pub fn add_supplementary_rule(&mut self, line: &str) -> Result<(), PslError> {
        self.rules.ingest(line)?;
        Ok(())
    }

    /// Hex-encoded SHA-256 of every byte fed via [`Self::add_line`] so far.
    pub fn checksum(&self) -> String {
        HEXLOWER.encode(&self.hasher.clone().finalize())
    }

    /// Runs the eight-pass pipeline (six conceptual passes; shadowing repair and apex TXT
    /// counted separately here) and returns the compiled zone.
    pub fn compile(&self, timestamp: u64) -> Result<RRsets, PslError> {
        let mut rrsets = RRsets::new();

        pass_a_regular(&self.rules, &mut rrsets);
        pass_b_proper_wildcard(&self.rules, &mut rrsets);
        pass_c_wildcard_exception(&self.rules, &mut rrsets);
        pass_d_inline_wildcard(&self.rules, &mut rrsets);
        pass_e_exception_priority(&self.rules, &mut rrsets);
        pass_f_root_rule(&mut rrsets);
        pass_g_wildcard_shadowing(&mut rrsets);
        pass_h_apex_txt(&mut rrsets, timestamp, &self.checksum());

        Ok(rrsets)
    }
}

fn pass_a_regular(rules: &RuleStore, rrsets: &mut RRsets) {
    for suffix in &rules.regular {
        set_rrsets(rrsets, suffix, vec![(RRType::Ptr, vec![suffix.clone()])]);
    }
}

fn pass_b_proper_wildcard(rules: &RuleStore, rrsets: &mut RRsets) {
    for wildcard_rule in &rules.proper_wildcard {
        set_rrsets(rrsets, wildcard_rule, vec![(RRType::Ptr, vec![wildcard_rule.clone()])]);
    }
}

fn pass_c_wildcard_exception(rules: &RuleStore, rrsets: &mut RRsets) {
    for rule in &rules.wildcard_exception {
        // Step 1: find the nearest ancestor P (possibly the root, "*") whose wildcard
        // sibling *.P already has an RRset.
        let mut parent = rule.clone();
        loop {
            let still_searching = parent == *rule || !rrsets.contains_key(&format!("*.{}", parent));
            if !still_searching {
                break;
            }
            match parent.split_once('.') {
                Some((_, rest)) => parent = rest.to_string(),
                None => {
                    parent = "*".to_string();
                    break;
                }
            }
        }
        let excepted_wildcard = format!("*.{}", parent);

        // Step 2: continue ascending to find the nearest covering rule, preferring the
        // bare parent, then its wildcard sibling, else ascending further.
        loop {
            let still_searching = parent != "*" && !rrsets.contains_key(&parent);
            if !still_searching {
                break;
            }
            match parent.split_once('.') {
                Some((_, rest)) => parent = rest.to_string(),
                None => {
                    parent = "*".to_string();
                    break;
                }
            }
            let sibling = format!("*.{}", parent);
            if rrsets.contains_key(&sibling) {
                parent = sibling;
            }
        }

        // Step 3.
        let txt = vec![
            format!("\"{}\"", excepted_wildcard),
            format!("\"!{}\"", rule),
        ];
        set_rrsets(
            rrsets,
            rule,
            vec![(RRType::Ptr, vec![parent]), (RRType::Txt, txt)],
        );
    }
}

fn pass_d_inline_wildcard(rules: &RuleStore, rrsets: &mut RRsets) {
    let mut by_parent: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for rule in &rules.inline_wildcard {
        let parent = rule.rsplit_once('*').map(|(_, after)| after.to_string()).unwrap_or_default();
        by_parent.entry(parent).or_default().push(rule.clone());
    }

    for (parent, mut group) in by_parent {
        let owner = format!("*{}", parent);
        if let Some(existing) = rrsets.get(&owner) {
            if let Some(shadowed) = existing.first().and_then(|rrset| rrset.records.first()) {
                let shadowed = shadowed.strip_suffix('.').unwrap_or(shadowed);
                group.push(shadowed.to_string());
            }
        }

        let quoted: Vec<String> = group.iter().map(|rule| format!("\"{}\"", rule)).collect();
        set_rrsets(rrsets, &owner, vec![(RRType::Txt, quoted)]);
    }
}

fn pass_e_exception_priority(rules: &RuleStore, rrsets: &mut RRsets) {
    for rule in &rules.wildcard_exception {
        let suffix = format!(".{}", rule);
        rrsets.retain(|owner, _| !owner.ends_with(&suffix));
    }
}

fn pass_f_root_rule(rrsets: &mut RRsets) {
    set_rrsets(rrsets, "*", vec![(RRType::Ptr, vec!["*".to_string()])]);
}

fn pass_g_wildcard_shadowing(rrsets: &mut RRsets) {
    let owners: Vec<String> = rrsets.keys().cloned().collect();

    for owner in owners {
        let mut current = owner;
        loop {
            if current.is_empty() {
                break;
            }
            let wild = format!("*.{}", current);
            if rrsets.contains_key(&current) && rrsets.contains_key(&wild) {
                break;
            }

            let next = current.split_once('.').map(|(_, rest)| rest.to_string()).unwrap_or_default();

            if !current.starts_with('*') {
                if !rrsets.contains_key(&current) {
                    let target = if next.is_empty() { "*".to_string() } else { next.clone() };
                    set_rrsets(rrsets, &current, vec![(RRType::Cname, vec![target])]);
                }
                if !rrsets.contains_key(&wild) {
                    set_rrsets(rrsets, &wild, vec![(RRType::Cname, vec![current.clone()])]);
                }
            }

            current = next;
        }
    }
}

fn pass_h_apex_txt(rrsets: &mut RRsets, timestamp: u64, checksum: &str) {
    set_rrsets(
        rrsets,
        "",
        vec![(RRType::Txt, vec![format!("\"{} {}\"", timestamp, checksum)])],
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn compile_str(input: &str, timestamp: u64) -> RRsets {
        let mut compiler = Compiler::new();
        compiler.process(Cursor::new(input.as_bytes())).unwrap();
        compiler.compile(timestamp).unwrap()
    }

    #[test]
    fn regular_rule_gets_a_ptr_to_itself() {
        let rrsets = compile_str("com\n", 0);
        let rrset = &rrsets["com"];
        assert_eq!(rrset.len(), 1);
        assert_eq!(rrset[0].rtype, RRType::Ptr);
        assert_eq!(rrset[0].records, vec!["com".to_string()]);
    }

    #[test]
    fn root_rule_always_present() {
        let rrsets = compile_str("com\n", 0);
        let rrset = &rrsets["*"];
        assert_eq!(rrset[0].rtype, RRType::Ptr);
        assert_eq!(rrset[0].records, vec!["*".to_string()]);
    }

    #[test]
    fn apex_txt_contains_timestamp_and_checksum() {
        let mut compiler = Compiler::new();
        compiler.process(Cursor::new(b"com\n" as &[u8])).unwrap();
        let checksum = compiler.checksum();
        let rrsets = compiler.compile(1234).unwrap();
        let apex = &rrsets[""];
        assert_eq!(apex[0].rtype, RRType::Txt);
        assert_eq!(apex[0].records, vec![format!("\"1234 {}\"", checksum)]);
    }

    #[test]
    fn proper_wildcard_and_exception_cooperate() {
        let rrsets = compile_str("ck\n*.ck\n!www.ck\n", 0);

        let exception = &rrsets["www.ck"];
        assert!(exception.iter().any(|r| r.rtype == RRType::Ptr && r.records == vec!["ck".to_string()]));
        assert!(exception.iter().any(|r| r.rtype == RRType::Txt
            && r.records == vec!["\"*.ck\"".to_string(), "\"!www.ck\"".to_string()]));

        // Pass E deletes sub-owners of the exception.
        assert!(!rrsets.contains_key("a.www.ck"));
    }

    #[test]
    fn inline_wildcard_rules_group_by_parent_and_carry_no_ptr() {
        let rrsets = compile_str("*.wildcard.test\ninline.*.wildcard.test\n", 0);
        let owner = &rrsets["*.wildcard.test"];
        assert!(owner.iter().all(|r| r.rtype != RRType::Ptr));
        let txt = owner.iter().find(|r| r.rtype == RRType::Txt).unwrap();
        assert!(txt.records.iter().any(|r| r.contains("inline.*.wildcard.test")));
    }

    #[test]
    fn wildcard_shadowing_links_every_ancestor() {
        let rrsets = compile_str("eu-west-1.amazonaws.com\n", 0);
        assert!(rrsets.contains_key("*.eu-west-1.amazonaws.com"));
        assert!(rrsets.contains_key("amazonaws.com"));
        assert!(rrsets.contains_key("*.amazonaws.com"));
        assert!(rrsets.contains_key("com"));
        assert!(rrsets.contains_key("*.com"));
    }

    #[test]
    fn compile_is_deterministic_modulo_timestamp() {
        let a = compile_str("com\nco.uk\n", 111);
        let b = compile_str("com\nco.uk\n", 222);
        for (owner, rrset) in &a {
            if owner.is_empty() {
                continue;
            }
            assert_eq!(&b[owner], rrset);
        }
    }
}
