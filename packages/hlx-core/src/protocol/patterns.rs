//! Compiled dispatch patterns.
//!
//! Every wire command carries a pattern and an expected substring-match
//! count; the request and report tables in [`crate::protocol::parse`] pair
//! each pattern with its typed parser and try them in a fixed priority
//! order, more specific shapes first.
//!
//! The grammar fragments (identifiers, booleans, EUI-48, IPv4/IPv6) are
//! reproduced from the hardware's documented forms; inner alternations use
//! non-capturing groups so each address contributes exactly one substring
//! match.

use regex::{Captures, Regex};

/// A compiled pattern plus its expected substring-match count.
///
/// The count includes the whole-frame match, so a pattern with one group
/// expects two matches.
#[derive(Debug)]
pub struct Matcher {
    pattern: String,
    regex: Regex,
    expected_matches: usize,
}

impl Matcher {
    /// Compiles an anchored matcher.
    ///
    /// Panics on an invalid pattern or a capture-count mismatch; both are
    /// table-construction bugs, caught by the table tests.
    #[must_use]
    pub fn new(pattern: &str, expected_matches: usize) -> Self {
        let anchored = format!("^{pattern}$");
        let regex = Regex::new(&anchored)
            .unwrap_or_else(|e| panic!("pattern {anchored:?} failed to compile: {e}"));
        assert_eq!(
            regex.captures_len(),
            expected_matches,
            "pattern {anchored:?} declares {expected_matches} matches but compiles to {}",
            regex.captures_len()
        );
        Self {
            pattern: anchored,
            regex,
            expected_matches,
        }
    }

    /// Matches a whole frame payload, yielding captures on success.
    #[must_use]
    pub fn captures<'t>(&self, frame: &'t str) -> Option<Captures<'t>> {
        self.regex.captures(frame)
    }

    /// Returns the anchored pattern source.
    #[must_use]
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Returns the expected substring-match count.
    #[must_use]
    pub fn expected_matches(&self) -> usize {
        self.expected_matches
    }
}

/// A 1-based decimal identifier.
pub const ID: &str = "([[:digit:]]+)";

/// A signed decimal value.
pub const SIGNED: &str = "(-?[[:digit:]]+)";

/// A boolean flag.
pub const BOOL: &str = "([01])";

/// A quoted entity name.
pub const NAME: &str = "\"([[:print:]]+)\"";

/// An EUI-48 address: six hyphen-separated hex octets.
pub const EUI48: &str = "((?:[[:xdigit:]]{2}-){5}[[:xdigit:]]{2})";

/// A dotted-quad octet.
const DEC_OCTET: &str = "(?:25[0-5]|2[0-4][0-9]|[01]?[0-9][0-9]?)";

/// One 16-bit IPv6 hextet.
const H16: &str = "[[:xdigit:]]{1,4}";

/// Builds the IPv4 dotted-quad grammar (non-capturing).
fn ipv4() -> String {
    format!("(?:(?:{DEC_OCTET}\\.){{3}}{DEC_OCTET})")
}

/// Builds the IPv6 least-significant-32-bits grammar (non-capturing).
fn ls32() -> String {
    format!("(?:{H16}:{H16}|{})", ipv4())
}

/// Builds the full RFC-shaped IPv6 grammar (non-capturing).
fn ipv6() -> String {
    let ls32 = ls32();
    format!(
        "(?:(?:\
(?:{H16}:){{6}}|\
::(?:{H16}:){{5}}|\
(?:{H16})?::(?:{H16}:){{4}}|\
(?:(?:{H16}:){{0,1}}{H16})?::(?:{H16}:){{3}}|\
(?:(?:{H16}:){{0,2}}{H16})?::(?:{H16}:){{2}}|\
(?:(?:{H16}:){{0,3}}{H16})?::(?:{H16}:)|\
(?:(?:{H16}:){{0,4}}{H16})?::\
){ls32}|\
(?:(?:{H16}:){{0,5}}{H16})?::{H16}|\
(?:(?:{H16}:){{0,6}}{H16})?::)"
    )
}

/// Builds the combined address grammar: one capturing group holding either
/// an IPv4 or an IPv6 address.
#[must_use]
pub fn ip_address() -> String {
    format!("({}|{})", ipv4(), ipv6())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matcher_is_anchored() {
        let matcher = Matcher::new(&format!("QO{ID}"), 2);
        assert!(matcher.captures("QO3").is_some());
        assert!(matcher.captures("QO3X").is_none());
        assert!(matcher.captures("XQO3").is_none());
    }

    #[test]
    fn ip_grammar_accepts_v4() {
        let matcher = Matcher::new(&format!("IP{}", ip_address()), 2);
        let caps = matcher.captures("IP192.168.1.48").unwrap();
        assert_eq!(&caps[1], "192.168.1.48");
        assert!(matcher.captures("IP256.1.1.1").is_none());
        assert!(matcher.captures("IP192.168.1").is_none());
    }

    #[test]
    fn ip_grammar_accepts_v6() {
        let matcher = Matcher::new(&format!("IP{}", ip_address()), 2);
        for addr in [
            "IPfe80::1",
            "IP::1",
            "IP::",
            "IP2001:db8:0:0:0:0:2:1",
            "IP2001:db8::2:1",
            "IP::ffff:192.168.1.48",
        ] {
            assert!(matcher.captures(addr).is_some(), "rejected {addr}");
        }
    }

    #[test]
    fn eui48_grammar_matches_hardware_form() {
        let matcher = Matcher::new(&format!("MAC{EUI48}"), 2);
        let caps = matcher.captures("MAC70-B3-D5-07-0A-1F").unwrap();
        assert_eq!(&caps[1], "70-B3-D5-07-0A-1F");
        assert!(matcher.captures("MAC70-B3-D5-07-0A").is_none());
        assert!(matcher.captures("MAC70:B3:D5:07:0A:1F").is_none());
    }

    #[test]
    #[should_panic(expected = "declares")]
    fn capture_count_mismatch_is_a_construction_bug() {
        let _ = Matcher::new(&format!("QO{ID}"), 3);
    }
}
