//! Wallet address normalization and validation.
//!
//! Every identifier that enters the pipeline is an [`Address`]: trimmed,
//! lower-cased, `0x` followed by exactly 40 hex digits. Anything else is
//! rejected before chunking.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static ADDRESS_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^0x[0-9a-f]{40}$").expect("address regex is valid"));

/// A validated, lower-cased wallet address.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// Parses a raw string into an address.
    ///
    /// Returns `None` for empty or malformed input.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = raw.trim().to_ascii_lowercase();
        if ADDRESS_RE.is_match(&normalized) {
            Some(Self(normalized))
        } else {
            None
        }
    }

    /// Parses a broker message payload.
    ///
    /// Accepts a bare address or a JSON string literal (`"0x..."`), which is
    /// what the address producer writes.
    pub fn from_payload(payload: &[u8]) -> Option<Self> {
        let text = std::str::from_utf8(payload).ok()?.trim();
        if text.starts_with('"') {
            let unquoted: String = serde_json::from_str(text).ok()?;
            return Self::parse(&unquoted);
        }
        Self::parse(text)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Case-insensitive comparison against an address returned by an
    /// external service.
    pub fn matches(&self, other: &str) -> bool {
        self.0.eq_ignore_ascii_case(other.trim())
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Address {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Address {
    type Error = crate::Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
            .ok_or_else(|| crate::Error::validation(format!("invalid address: {value}")))
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}

/// Result of normalizing a sequence of raw payloads.
#[derive(Debug, Default)]
pub struct Normalized {
    pub addresses: Vec<Address>,
    /// Number of payloads that were empty or not an address.
    pub rejected: usize,
}

/// Normalizes raw payloads in order, dropping malformed values.
///
/// Payloads are not deduplicated; the cache gate handles repeats.
pub fn normalize_payloads<'a, I>(payloads: I) -> Normalized
where
    I: IntoIterator<Item = Option<&'a [u8]>>,
{
    let mut out = Normalized::default();
    for payload in payloads {
        match payload.and_then(Address::from_payload) {
            Some(address) => out.addresses.push(address),
            None => out.rejected += 1,
        }
    }
    out
}
