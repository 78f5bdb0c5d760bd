//! Rule Lexer and Rule Classifier & Store (spec §4.1, §4.3).

use crate::error::PslError;
use crate::idna;

/// Converts a single PSL source line into a normalized rule string.
///
/// Strips leading/trailing whitespace, discards blank lines and `//` comments, and
/// lowercases the remainder. Never fails; malformed IDNA is deferred to classification.
pub fn lex(line: &str) -> Option<String> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with("//") {
        return None;
    }
    Some(trimmed.to_lowercase())
}

/// The four PSL rule shapes (spec §3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuleKind {
    Regular,
    ProperWildcard,
    WildcardException,
    InlineWildcard,
}

/// Classifies an already-lexed, lowercased rule string.
pub fn classify(rule: &str) -> RuleKind {
    let bytes = rule.as_bytes();
    if bytes.first() == Some(&b'!') {
        RuleKind::WildcardException
    } else if bytes.first() == Some(&b'*') {
        if bytes[1..].contains(&b'*') {
            RuleKind::InlineWildcard
        } else {
            RuleKind::ProperWildcard
        }
    } else if bytes.contains(&b'*') {
        RuleKind::InlineWildcard
    } else {
        RuleKind::Regular
    }
}

/// The four ordered, duplicate-tolerant rule buckets, holding IDNA-encoded (ASCII) rules.
#[derive(Debug, Default, Clone)]
pub struct RuleStore {
    pub regular: Vec<String>,
    pub proper_wildcard: Vec<String>,
    pub wildcard_exception: Vec<String>,
    pub inline_wildcard: Vec<String>,
}

impl RuleStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lexes, classifies, IDNA-encodes, and stores `line` in its bucket.
    ///
    /// Returns `Ok(None)` for blank/comment lines, without touching any bucket.
    pub fn ingest(&mut self, line: &str) -> Result<Option<RuleKind>, PslError> {
        let rule = match lex(line) {
            Some(rule) => rule,
            None => return Ok(None),
        };

        let kind = classify(&rule);
        match kind {
            RuleKind::WildcardException => {
                let body = idna::domain_to_ascii(&rule[1..])?;
                self.wildcard_exception.push(body);
            }
            RuleKind::ProperWildcard => {
                self.proper_wildcard.push(idna::domain_to_ascii(&rule)?);
            }
            RuleKind::InlineWildcard => {
                self.inline_wildcard.push(idna::domain_to_ascii(&rule)?);
            }
            RuleKind::Regular => {
                self.regular.push(idna::domain_to_ascii(&rule)?);
            }
        }

        Ok(Some(kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lex_skips_blank_and_comment_lines() {
        assert_eq!(lex(""), None);
        assert_eq!(lex("   \n"), None);
        assert_eq!(lex("// a comment\n"), None);
        assert_eq!(lex("  CoM\n"), Some("com".to_string()));
    }

    #[test]
    fn classify_distinguishes_all_four_kinds() {
        assert_eq!(classify("com"), RuleKind::Regular);
        assert_eq!(classify("*.ck"), RuleKind::ProperWildcard);
        assert_eq!(classify("!www.ck"), RuleKind::WildcardException);
        assert_eq!(classify("a.*.b"), RuleKind::InlineWildcard);
        assert_eq!(classify("*.a.*.b"), RuleKind::InlineWildcard);
    }

    #[test]
    fn ingest_strips_exclamation_before_idna_encoding() {
        let mut store = RuleStore::new();
        store.ingest("!www.ck\n").unwrap();
        assert_eq!(store.wildcard_exception, vec!["www.ck".to_string()]);
    }

    #[test]
    fn ingest_preserves_insertion_order_within_a_bucket() {
        let mut store = RuleStore::new();
        store.ingest("com\n").unwrap();
        store.ingest("co.uk\n").unwrap();
        assert_eq!(store.regular, vec!["com".to_string(), "co.uk".to_string()]);
    }
}
