//! Filter operators and their symbolic forms.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::error::FilterError;

/// A comparison, membership or wildcard operator attached to a column filter.
///
/// Every operator has a canonical token (see [`Operator::as_str`]) and accepts a
/// few symbolic aliases when parsed. Tokens are case-sensitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Operator {
    // ==================== Equality ====================
    /// Value equals one of the search terms.
    #[default]
    Equal,

    /// Value equals none of the search terms.
    NotEqual,

    // ==================== Membership ====================
    /// Value is one of the search terms.
    In,

    /// Value is none of the search terms.
    NotIn,

    /// Value (a list or comma-joined string) contains one of the search terms.
    InContains,

    /// Value (a list or comma-joined string) contains none of the search terms.
    NotInContains,

    // ==================== Substring ====================
    /// Text starts with a search term (`a*`).
    StartsWith,

    /// Text ends with a search term (`*z`).
    EndsWith,

    /// Text contains a search term (`*`).
    Contains,

    /// Text contains none of the search terms.
    NotContains,

    // ==================== Ordering ====================
    /// Value is strictly less than a search term.
    LessThan,

    /// Value is less than or equal to a search term.
    LessThanOrEqual,

    /// Value is strictly greater than a search term.
    GreaterThan,

    /// Value is greater than or equal to a search term.
    GreaterThanOrEqual,
}

impl Operator {
    /// Returns the canonical token for this operator.
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Equal => "EQ",
            Operator::NotEqual => "NE",
            Operator::In => "IN",
            Operator::NotIn => "NIN",
            Operator::InContains => "IN_CONTAINS",
            Operator::NotInContains => "NOT_IN_CONTAINS",
            Operator::StartsWith => "a*",
            Operator::EndsWith => "*z",
            Operator::Contains => "Contains",
            Operator::NotContains => "Not_Contains",
            Operator::LessThan => "LT",
            Operator::LessThanOrEqual => "LE",
            Operator::GreaterThan => "GT",
            Operator::GreaterThanOrEqual => "GE",
        }
    }

    /// Returns true for the substring operators that a `*` marker can express.
    pub fn is_wildcard(&self) -> bool {
        matches!(
            self,
            Operator::StartsWith | Operator::EndsWith | Operator::Contains
        )
    }

    /// Returns true when every search term must hold for the filter to match.
    ///
    /// Negative operators exclude rows matching any term, so their per-term
    /// conditions combine with AND; all others combine with OR.
    pub fn is_negative(&self) -> bool {
        matches!(
            self,
            Operator::NotEqual
                | Operator::NotIn
                | Operator::NotInContains
                | Operator::NotContains
        )
    }

    /// Parses an operator embedded at the start of a search term (`>=18`, `<>x`).
    ///
    /// Returns the operator and the number of bytes the prefix occupies.
    pub(crate) fn parse_prefix(term: &str) -> Option<(Operator, usize)> {
        // Two-character prefixes first so `>=` never parses as `>`.
        const PREFIXES: [(&str, Operator); 8] = [
            (">=", Operator::GreaterThanOrEqual),
            ("<=", Operator::LessThanOrEqual),
            ("<>", Operator::NotEqual),
            ("!=", Operator::NotEqual),
            ("==", Operator::Equal),
            (">", Operator::GreaterThan),
            ("<", Operator::LessThan),
            ("=", Operator::Equal),
        ];

        PREFIXES
            .iter()
            .find(|(prefix, _)| term.starts_with(prefix))
            .map(|(prefix, op)| (*op, prefix.len()))
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Operator {
    type Err = FilterError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let op = match s.trim() {
            "" | "EQ" | "=" | "==" => Operator::Equal,
            "NE" | "!=" | "<>" => Operator::NotEqual,
            "IN" => Operator::In,
            "NIN" | "NOT_IN" => Operator::NotIn,
            "IN_CONTAINS" => Operator::InContains,
            "NOT_IN_CONTAINS" => Operator::NotInContains,
            "a*" | "StartsWith" => Operator::StartsWith,
            "*z" | "EndsWith" => Operator::EndsWith,
            "*" | "Contains" => Operator::Contains,
            "Not_Contains" => Operator::NotContains,
            "LT" | "<" => Operator::LessThan,
            "LE" | "<=" => Operator::LessThanOrEqual,
            "GT" | ">" => Operator::GreaterThan,
            "GE" | ">=" => Operator::GreaterThanOrEqual,
            other => return Err(FilterError::unknown_operator(other)),
        };
        Ok(op)
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let token = String::deserialize(deserializer)?;
        token.parse().map_err(serde::de::Error::custom)
    }
}
