//! IP range specifications.
//!
//! Machine groups identify their members with a comma separated list of tokens, each of which is
//! one of:
//!
//! * a single address, e.g. `10.0.0.1` or `::1`
//! * a CIDR block, e.g. `192.168.0.0/16` or `fe80::/10`
//! * an inclusive `(from, to)` range, e.g. `("10.0.0.1", "10.0.0.19")`
//!
//! Addresses may be wrapped in single or double quotes, and whitespace around tokens is ignored.
//! IPv4 and IPv6 tokens may be mixed in one specification; an address is only ever compared
//! against tokens of its own family.
//!
//! ```
//! use pxecrab::IpRanges;
//!
//! let ranges: IpRanges = r#""192.168.0.1", "10.0.0.0/8""#.parse().unwrap();
//! assert!(ranges.contains("10.5.5.5".parse().unwrap()));
//! assert!(!ranges.contains("172.16.0.1".parse().unwrap()));
//! ```
use ipnetwork::IpNetwork;
use serde_with::{DeserializeFromStr, SerializeDisplay};
use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

/// Errors produced while parsing an IP range specification.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum RangeParseError {
    #[error("empty token in IP range specification")]
    EmptyToken,

    #[error("unbalanced parentheses in IP range specification")]
    Unbalanced,

    #[error("unrecognized IP range token \"{0}\"")]
    InvalidToken(String),

    #[error("prefix /{1} is out of range for {0}")]
    InvalidPrefix(IpAddr, u8),

    #[error("range endpoints {0} and {1} are of different address families")]
    MixedFamilies(IpAddr, IpAddr),

    #[error("range start {0} is greater than range end {1}")]
    Reversed(IpAddr, IpAddr),
}

/// An inclusive span of addresses of a single family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct IpRange {
    start: IpAddr,
    end: IpAddr,
}

impl IpRange {
    /// Build a range from two endpoints, rejecting mixed families and reversed endpoints.
    ///
    /// # Errors
    ///
    /// Returns [`RangeParseError::MixedFamilies`] or [`RangeParseError::Reversed`].
    pub fn new(start: IpAddr, end: IpAddr) -> Result<Self, RangeParseError> {
        if start.is_ipv4() != end.is_ipv4() {
            return Err(RangeParseError::MixedFamilies(start, end));
        }
        if start > end {
            return Err(RangeParseError::Reversed(start, end));
        }
        Ok(Self { start, end })
    }

    #[must_use]
    pub fn single(addr: IpAddr) -> Self {
        Self {
            start: addr,
            end: addr,
        }
    }

    #[must_use]
    pub fn from_network(network: IpNetwork) -> Self {
        let (start, end) = match network {
            IpNetwork::V4(net) => {
                let host = u32::MAX.checked_shr(u32::from(net.prefix())).unwrap_or(0);
                let first = u32::from(net.network());
                (
                    IpAddr::V4(Ipv4Addr::from(first)),
                    IpAddr::V4(Ipv4Addr::from(first | host)),
                )
            }
            IpNetwork::V6(net) => {
                let host = u128::MAX.checked_shr(u32::from(net.prefix())).unwrap_or(0);
                let first = u128::from(net.network());
                (
                    IpAddr::V6(Ipv6Addr::from(first)),
                    IpAddr::V6(Ipv6Addr::from(first | host)),
                )
            }
        };
        Self { start, end }
    }

    #[must_use]
    pub fn start(&self) -> IpAddr {
        self.start
    }

    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        addr.is_ipv4() == self.start.is_ipv4() && self.start <= addr && addr <= self.end
    }

    /// The CIDR prefix length if this range is exactly one aligned network block.
    fn prefix_len(&self) -> Option<u32> {
        let (start, end, bits) = match (self.start, self.end) {
            (IpAddr::V4(s), IpAddr::V4(e)) => (u128::from(u32::from(s)), u128::from(u32::from(e)), 32),
            (IpAddr::V6(s), IpAddr::V6(e)) => (u128::from(s), u128::from(e), 128),
            _ => return None,
        };
        let host = end - start;
        let aligned = host & host.wrapping_add(1) == 0 && start & host == 0;
        aligned.then(|| bits - host.count_ones())
    }
}

impl fmt::Display for IpRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.start == self.end {
            return write!(f, "\"{}\"", self.start);
        }
        match self.prefix_len() {
            Some(prefix) => write!(f, "\"{}/{prefix}\"", self.start),
            None => write!(f, "(\"{}\", \"{}\")", self.start, self.end),
        }
    }
}

/// A parsed IP range specification.
///
/// The text the specification was parsed from is kept for display, while equality only considers
/// the canonical (sorted, deduplicated) list of ranges.
#[derive(Debug, Clone, Default, SerializeDisplay, DeserializeFromStr)]
pub struct IpRanges {
    text: Option<String>,
    ranges: Vec<IpRange>,
}

impl IpRanges {
    /// Parse an IP range specification, keeping `text` for display.
    ///
    /// An empty (or all whitespace) specification yields an empty set.
    ///
    /// # Errors
    ///
    /// Returns a [`RangeParseError`] describing the first malformed token.
    pub fn parse(text: &str) -> Result<Self, RangeParseError> {
        let mut ranges = split_tokens(text)?
            .into_iter()
            .map(parse_token)
            .collect::<Result<Vec<_>, _>>()?;
        ranges.sort_unstable();
        ranges.dedup();
        Ok(Self {
            text: Some(text.to_string()),
            ranges,
        })
    }

    #[must_use]
    pub fn contains(&self, addr: IpAddr) -> bool {
        self.ranges.iter().any(|range| range.contains(addr))
    }

    #[must_use]
    pub fn ranges(&self) -> &[IpRange] {
        &self.ranges
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ranges.is_empty()
    }

    /// The lowest address in the set (IPv4 addresses sort before IPv6 addresses).
    #[must_use]
    pub fn first_address(&self) -> Option<IpAddr> {
        self.ranges.first().map(IpRange::start)
    }

    /// The canonical textual form, independent of how the set was originally written.
    #[must_use]
    pub fn canonical(&self) -> String {
        self.ranges
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl PartialEq for IpRanges {
    fn eq(&self, other: &Self) -> bool {
        self.ranges == other.ranges
    }
}

impl Eq for IpRanges {}

impl fmt::Display for IpRanges {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.text {
            Some(text) => f.write_str(text),
            None => f.write_str(&self.canonical()),
        }
    }
}

impl FromStr for IpRanges {
    type Err = RangeParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Split on commas that are not nested inside a `(from, to)` pair.
fn split_tokens(text: &str) -> Result<Vec<&str>, RangeParseError> {
    if text.trim().is_empty() {
        return Ok(Vec::new());
    }

    let mut tokens = Vec::new();
    let mut depth = 0usize;
    let mut token_start = 0;
    for (idx, ch) in text.char_indices() {
        match ch {
            '(' => depth += 1,
            ')' => depth = depth.checked_sub(1).ok_or(RangeParseError::Unbalanced)?,
            ',' if depth == 0 => {
                tokens.push(text[token_start..idx].trim());
                token_start = idx + 1;
            }
            _ => {}
        }
    }
    if depth != 0 {
        return Err(RangeParseError::Unbalanced);
    }
    tokens.push(text[token_start..].trim());

    if tokens.iter().any(|t| t.is_empty()) {
        return Err(RangeParseError::EmptyToken);
    }
    Ok(tokens)
}

fn parse_token(token: &str) -> Result<IpRange, RangeParseError> {
    if let Some(inner) = token.strip_prefix('(').and_then(|t| t.strip_suffix(')')) {
        let (from, to) = inner
            .split_once(',')
            .ok_or_else(|| RangeParseError::InvalidToken(token.to_string()))?;
        return IpRange::new(parse_addr(from)?, parse_addr(to)?);
    }

    let unquoted = unquote(token);
    match unquoted.split_once('/') {
        Some((addr, prefix)) => {
            let addr = parse_addr(addr)?;
            let prefix: u8 = prefix
                .trim()
                .parse()
                .map_err(|_| RangeParseError::InvalidToken(token.to_string()))?;
            let network =
                IpNetwork::new(addr, prefix).map_err(|_| RangeParseError::InvalidPrefix(addr, prefix))?;
            Ok(IpRange::from_network(network))
        }
        None => Ok(IpRange::single(parse_addr(unquoted)?)),
    }
}

fn parse_addr(raw: &str) -> Result<IpAddr, RangeParseError> {
    let addr = unquote(raw.trim());
    IpAddr::from_str(addr).map_err(|_| RangeParseError::InvalidToken(raw.trim().to_string()))
}

fn unquote(raw: &str) -> &str {
    let raw = raw.trim();
    for quote in ['"', '\''] {
        if let Some(inner) = raw.strip_prefix(quote).and_then(|r| r.strip_suffix(quote)) {
            return inner.trim();
        }
    }
    raw
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ip(s: &str) -> IpAddr {
        s.parse().unwrap()
    }

    #[test]
    fn test_two_ipv4_tokens() {
        let ranges = IpRanges::parse(r#""192.168.0.1", "10.0.0.0/8""#).unwrap();
        assert_eq!(ranges.ranges().len(), 2);
        assert!(ranges.contains(ip("10.5.5.5")));
        assert!(ranges.contains(ip("192.168.0.1")));
        assert!(!ranges.contains(ip("172.16.0.1")));
        assert!(!ranges.contains(ip("192.168.0.2")));
    }

    #[test]
    fn test_cidr_boundaries() {
        let ranges = IpRanges::parse("192.168.1.0/24").unwrap();
        assert!(!ranges.contains(ip("192.168.0.255")));
        assert!(ranges.contains(ip("192.168.1.0")));
        assert!(ranges.contains(ip("192.168.1.255")));
        assert!(!ranges.contains(ip("192.168.2.0")));
    }

    #[test]
    fn test_explicit_range_boundaries() {
        let ranges = IpRanges::parse("('10.0.0.1', '10.0.0.19')").unwrap();
        assert!(!ranges.contains(ip("10.0.0.0")));
        assert!(ranges.contains(ip("10.0.0.1")));
        assert!(ranges.contains(ip("10.0.0.19")));
        assert!(!ranges.contains(ip("10.0.0.20")));
    }

    #[test]
    fn test_host_bits_in_cidr_are_masked() {
        let ranges = IpRanges::parse("10.1.2.3/16").unwrap();
        assert_eq!(ranges.first_address(), Some(ip("10.1.0.0")));
        assert!(ranges.contains(ip("10.1.255.255")));
        assert!(!ranges.contains(ip("10.2.0.0")));
    }

    #[test]
    fn test_ipv6_tokens() {
        let ranges = IpRanges::parse("'::1', 'fe80::/10', (\"2001:db8::1\", \"2001:db8::ff\")").unwrap();
        assert!(ranges.contains(ip("::1")));
        assert!(ranges.contains(ip("febf:ffff::1")));
        assert!(!ranges.contains(ip("fec0::")));
        assert!(ranges.contains(ip("2001:db8::ff")));
        assert!(!ranges.contains(ip("2001:db8::100")));
    }

    #[test]
    fn test_families_are_not_mixed_when_matching() {
        let ranges = IpRanges::parse("0.0.0.0/0").unwrap();
        assert!(ranges.contains(ip("255.255.255.255")));
        assert!(!ranges.contains(ip("::1")));

        let ranges = IpRanges::parse("::/0").unwrap();
        assert!(ranges.contains(ip("::ffff:10.0.0.1")));
        assert!(!ranges.contains(ip("10.0.0.1")));
    }

    #[test]
    fn test_empty_spec_is_empty_set() {
        let ranges = IpRanges::parse("  ").unwrap();
        assert!(ranges.is_empty());
        assert_eq!(ranges.first_address(), None);
        assert!(!ranges.contains(ip("10.0.0.1")));
    }

    #[test]
    fn test_reversed_range_is_rejected() {
        assert_eq!(
            IpRanges::parse(r#"("10.0.0.20","10.0.0.1")"#),
            Err(RangeParseError::Reversed(ip("10.0.0.20"), ip("10.0.0.1")))
        );
    }

    #[test]
    fn test_mixed_family_range_is_rejected() {
        assert_eq!(
            IpRanges::parse("('10.0.0.1', '::1')"),
            Err(RangeParseError::MixedFamilies(ip("10.0.0.1"), ip("::1")))
        );
    }

    #[test]
    fn test_prefix_out_of_range_is_rejected() {
        assert_eq!(
            IpRanges::parse("10.0.0.0/33"),
            Err(RangeParseError::InvalidPrefix(ip("10.0.0.0"), 33))
        );
        assert!(IpRanges::parse("fe80::/129").is_err());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        assert!(matches!(
            IpRanges::parse("192.168/16"),
            Err(RangeParseError::InvalidToken(_))
        ));
        assert!(matches!(
            IpRanges::parse("10.0.0.1, lab"),
            Err(RangeParseError::InvalidToken(_))
        ));
        assert_eq!(IpRanges::parse("10.0.0.1,"), Err(RangeParseError::EmptyToken));
        assert_eq!(
            IpRanges::parse("('10.0.0.1', '10.0.0.2'"),
            Err(RangeParseError::Unbalanced)
        );
        assert!(matches!(
            IpRanges::parse("('10.0.0.1')"),
            Err(RangeParseError::InvalidToken(_))
        ));
    }

    #[test]
    fn test_text_is_kept_but_ignored_for_equality() {
        let a = IpRanges::parse("10.0.0.0/30, 10.0.0.9").unwrap();
        let b = IpRanges::parse("'10.0.0.9', ('10.0.0.0', '10.0.0.3'), 10.0.0.9").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.to_string(), "10.0.0.0/30, 10.0.0.9");
        assert_eq!(b.canonical(), a.canonical());
    }

    #[test]
    fn test_canonical_form_reparses_to_equal_set() {
        for spec in [
            "192.168.1.0/24",
            "('10.0.0.1', '10.0.0.19'), '::1', 'fe80::/10'",
            "10.0.0.5, 10.0.0.4/31, 0.0.0.0/0",
            "",
        ] {
            let parsed = IpRanges::parse(spec).unwrap();
            let reparsed = IpRanges::parse(&parsed.canonical()).unwrap();
            assert_eq!(parsed, reparsed, "{spec}");
        }
    }

    #[test]
    fn test_canonical_form_prefers_cidr_notation() {
        let ranges = IpRanges::parse("('192.168.0.0', '192.168.0.255'), ('10.0.0.1', '10.0.0.2')").unwrap();
        assert_eq!(
            ranges.canonical(),
            r#"("10.0.0.1", "10.0.0.2"), "192.168.0.0/24""#
        );
    }

    #[test]
    fn test_serde_keeps_original_text() {
        let ranges: IpRanges = serde_json::from_str(r#""10.0.0.1, 10.0.1.0/24""#).unwrap();
        assert!(ranges.contains(ip("10.0.1.7")));
        assert_eq!(
            serde_json::to_string(&ranges).unwrap(),
            r#""10.0.0.1, 10.0.1.0/24""#
        );
        assert!(serde_json::from_str::<IpRanges>(r#""10.0.0.0/40""#).is_err());
    }
}
