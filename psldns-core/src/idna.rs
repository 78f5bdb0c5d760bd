//! IDNA normalization: Unicode labels to/from their ASCII-compatible (punycode) form.
//!
//! Per UTS #46, non-transitional processing (IDNA2008-ish), rather than the IDNA2003
//! behaviour the source mixes in inconsistently (see the "Open question — IDNA profile"
//! design note this crate resolves in favor of a single consistent profile).

use crate::error::PslError;

/// Encodes a single label to its ASCII-compatible form.
///
/// The wildcard label `*` passes through unchanged.
pub fn to_ascii_label(label: &str) -> Result<String, PslError> {
    if label == "*" {
        return Ok("*".to_string());
    }

    idna::Config::default()
        .to_ascii(label)
        .map_err(|_| PslError::InvalidLabel(label.to_string()))
}

/// Decodes a single ASCII-compatible label back to Unicode.
///
/// The wildcard label `*` passes through unchanged. A label that fails to decode is
/// returned unchanged rather than erroring, since `to_unicode` is meant to be total.
pub fn to_unicode_label(label: &str) -> String {
    if label == "*" {
        return "*".to_string();
    }

    let (unicode, result) = idna::domain_to_unicode(label);
    if result.is_ok() {
        unicode
    } else {
        label.to_string()
    }
}

/// Applies [`to_ascii_label`] label-wise across a whole domain, preserving label count
/// and order. Used for whole rules/domains rather than the DNS-root-relative sentinels
/// (`*`, `!`) which callers strip before invoking this.
pub fn domain_to_ascii(domain: &str) -> Result<String, PslError> {
    domain
        .split('.')
        .map(to_ascii_label)
        .collect::<Result<Vec<_>, _>>()
        .map(|labels| labels.join("."))
}

/// Applies [`to_unicode_label`] label-wise across a whole domain.
pub fn domain_to_unicode(domain: &str) -> String {
    domain
        .split('.')
        .map(to_unicode_label)
        .collect::<Vec<_>>()
        .join(".")
}

/// Decodes a PSL rule string back to Unicode, preserving a leading `!` exception sentinel
/// across the decode (the sentinel is not itself a domain label).
pub fn decode_rule(rule: &str) -> String {
    match rule.strip_prefix('!') {
        Some(body) => format!("!{}", domain_to_unicode(body)),
        None => domain_to_unicode(rule),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wildcard_label_passes_through() {
        assert_eq!(to_ascii_label("*").unwrap(), "*");
        assert_eq!(to_unicode_label("*"), "*");
    }

    #[test]
    fn ascii_round_trips_unicode_domain() {
        let ascii = domain_to_ascii("公司.cn").unwrap();
        assert_eq!(ascii, "xn--55qx5d.cn");
        assert_eq!(domain_to_unicode(&ascii), "公司.cn");
    }

    #[test]
    fn ascii_domain_is_unchanged() {
        assert_eq!(domain_to_ascii("example.co.uk").unwrap(), "example.co.uk");
    }

    #[test]
    fn proper_wildcard_rule_keeps_its_sentinel() {
        assert_eq!(domain_to_ascii("*.ck").unwrap(), "*.ck");
    }

    #[test]
    fn decode_rule_preserves_exception_sentinel() {
        assert_eq!(decode_rule("!www.ck"), "!www.ck");
        assert_eq!(decode_rule("xn--55qx5d.cn"), "公司.cn");
    }
}
