//! Register names and the shadow-slot suffix convention.
//!
//! A register `foo.bar` may expose three read-only companions addressed by a
//! trailing marker: `foo.bar<` (minimum), `foo.bar>` (maximum) and
//! `foo.bar=` (default).

use std::borrow::Cow;
use std::fmt;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

/// `uavcan.register.Name`: raw name bytes as sent on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Name(Vec<u8>);

impl Name {
    pub fn from_bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self(bytes.into())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Decode as UTF-8, replacing invalid sequences.
    pub fn to_string_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.0)
    }
}

impl From<&str> for Name {
    fn from(s: &str) -> Self {
        Self(s.as_bytes().to_vec())
    }
}

impl From<String> for Name {
    fn from(s: String) -> Self {
        Self(s.into_bytes())
    }
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_string_lossy())
    }
}

/// Which copy of a register a wire name addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Value,
    Min,
    Max,
    Default,
}

impl Slot {
    pub const SHADOWS: [Slot; 3] = [Slot::Min, Slot::Max, Slot::Default];

    pub fn marker(&self) -> Option<char> {
        match self {
            Slot::Value => None,
            Slot::Min => Some('<'),
            Slot::Max => Some('>'),
            Slot::Default => Some('='),
        }
    }

    fn from_marker(c: char) -> Option<Slot> {
        match c {
            '<' => Some(Slot::Min),
            '>' => Some(Slot::Max),
            '=' => Some(Slot::Default),
            _ => None,
        }
    }

    pub fn is_shadow(&self) -> bool {
        !matches!(self, Slot::Value)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Slot::Value => "value",
            Slot::Min => "min",
            Slot::Max => "max",
            Slot::Default => "default",
        })
    }
}

/// Split a wire name into its base name and the slot it addresses.
///
/// The slot comes from the last character; every trailing marker is stripped
/// from the base name.
pub fn parse_wire_name(name: &str) -> (&str, Slot) {
    let slot = name
        .chars()
        .last()
        .and_then(Slot::from_marker)
        .unwrap_or(Slot::Value);
    let base = name.trim_end_matches(&['<', '>', '='][..]);
    (base, slot)
}

/// Compose the wire name addressing `slot` of register `base`.
pub fn wire_name(base: &str, slot: Slot) -> String {
    match slot.marker() {
        Some(marker) => format!("{base}{marker}"),
        None => base.to_string(),
    }
}

/// Whether `name` follows the Cyphal register naming convention: lowercase
/// alphanumeric segments separated by dots, at least two segments, optional
/// trailing underscore and slot marker.
pub fn follows_naming_convention(name: &str) -> bool {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN
        .get_or_init(|| {
            Regex::new(r"^([a-z]|_[0-9a-z])(_?[0-9a-z])*(\.(_?[0-9a-z])+)+_?[<=>]?$")
                .expect("register naming pattern is valid")
        })
        .is_match(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_plain_name() {
        assert_eq!(parse_wire_name("navlight.brightness"), ("navlight.brightness", Slot::Value));
    }

    #[test]
    fn parse_shadow_markers() {
        assert_eq!(parse_wire_name("a.b<"), ("a.b", Slot::Min));
        assert_eq!(parse_wire_name("a.b>"), ("a.b", Slot::Max));
        assert_eq!(parse_wire_name("a.b="), ("a.b", Slot::Default));
    }

    #[test]
    fn parse_strips_all_trailing_markers() {
        assert_eq!(parse_wire_name("a.b=<"), ("a.b", Slot::Min));
    }

    #[test]
    fn parse_empty_name() {
        assert_eq!(parse_wire_name(""), ("", Slot::Value));
    }

    #[test]
    fn wire_name_round_trips_through_parse() {
        for slot in [Slot::Value, Slot::Min, Slot::Max, Slot::Default] {
            let name = wire_name("uavcan.node.id", slot);
            assert_eq!(parse_wire_name(&name), ("uavcan.node.id", slot));
        }
    }

    #[test]
    fn naming_convention() {
        assert!(follows_naming_convention("uavcan.node.id"));
        assert!(follows_naming_convention("navlight.brightness="));
        assert!(follows_naming_convention("_vendor.thing_"));
        assert!(!follows_naming_convention("single"));
        assert!(!follows_naming_convention("Upper.case"));
        assert!(!follows_naming_convention("a..b"));
        assert!(!follows_naming_convention("a.b__c"));
    }

    #[test]
    fn lossy_name_decoding() {
        let name = Name::from_bytes(vec![b'a', 0xff, b'b']);
        assert_eq!(name.to_string_lossy(), "a\u{fffd}b");
    }
}
