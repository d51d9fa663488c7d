//! Identifier and subject canonicalization
//!
//! Both helpers are pure and allocation-light so they can be called from the
//! threading and merge passes as often as needed.

/// Reply and forward prefixes stripped from subjects (matched after lowercasing)
const REPLY_PREFIXES: [&str; 3] = ["re:", "fwd:", "fw:"];

/// Canonicalize a Message-ID style identifier.
///
/// Trims whitespace, removes one pair of wrapping angle brackets and lowercases
/// the rest. Blank input yields an empty string; callers must substitute a
/// generated identifier before using the value as a key.
///
/// ```rust
/// use inbox_triage::threading::normalize::normalize_identifier;
///
/// assert_eq!(normalize_identifier("<ABC@Example.com>"), "abc@example.com");
/// assert_eq!(normalize_identifier("  "), "");
/// ```
pub fn normalize_identifier(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let unwrapped = trimmed
        .strip_prefix('<')
        .and_then(|rest| rest.strip_suffix('>'))
        .unwrap_or(trimmed);

    unwrapped.to_lowercase()
}

/// Canonicalize a subject line for subject-based grouping.
///
/// Repeatedly removes `Re:`, `Fw:` and `Fwd:` prefixes and leading bracketed
/// tags such as `[Team]` until the subject is stable, then returns it
/// lowercased. An empty result means the subject cannot be used for grouping.
///
/// ```rust
/// use inbox_triage::threading::normalize::canonical_subject;
///
/// assert_eq!(canonical_subject("Re: [Team] Re: Budget"), "budget");
/// assert_eq!(canonical_subject("FWD: fw: Offsite"), "offsite");
/// ```
pub fn canonical_subject(subject: &str) -> String {
    let mut canonical = subject.trim().to_lowercase();

    loop {
        let before_len = canonical.len();

        for prefix in REPLY_PREFIXES {
            while let Some(rest) = canonical.strip_prefix(prefix) {
                canonical = rest.trim().to_string();
            }
        }

        if canonical.starts_with('[') {
            if let Some(end_bracket) = canonical.find(']') {
                canonical = canonical[end_bracket + 1..].trim().to_string();
            }
        }

        if canonical.len() == before_len {
            break;
        }
    }

    canonical
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identifier_strips_brackets_and_case() {
        assert_eq!(normalize_identifier("<ABC@Example.com>"), "abc@example.com");
        assert_eq!(normalize_identifier("  <x@y>  "), "x@y");
    }

    #[test]
    fn test_identifier_blank() {
        assert_eq!(normalize_identifier("  "), "");
        assert_eq!(normalize_identifier(""), "");
    }

    #[test]
    fn test_identifier_half_bracketed_is_kept() {
        assert_eq!(normalize_identifier("<Broken@Id"), "<broken@id");
        assert_eq!(normalize_identifier("<>"), "");
    }

    #[test]
    fn test_subject_nested_prefixes() {
        assert_eq!(canonical_subject("Re: [Team] Re: Budget"), "budget");
        assert_eq!(canonical_subject("RE: RE: Fwd: Quarterly Results"), "quarterly results");
    }

    #[test]
    fn test_subject_unclosed_bracket_survives() {
        assert_eq!(canonical_subject("[draft notes"), "[draft notes");
    }

    #[test]
    fn test_subject_only_prefixes_is_empty() {
        assert_eq!(canonical_subject("Re:"), "");
        assert_eq!(canonical_subject("  [tag]  "), "");
    }

    #[test]
    fn test_subject_prefix_needs_colon() {
        assert_eq!(canonical_subject("Reporting"), "reporting");
        assert_eq!(canonical_subject("Fwding rules"), "fwding rules");
    }
}
