use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// How the import surface recognizes a header line.
///
/// Only the first line of an import is tested. If it does not look like a
/// code under the chosen rule it is treated as a header and discarded.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderRule {
    /// Codes are all ASCII digits; anything else on line one is a header.
    #[default]
    Numeric,
    /// Codes are ASCII letters, digits, `-` and `_`.
    Alphanumeric,
    /// Never discard the first line.
    #[serde(alias = "disabled")]
    None,
}

impl HeaderRule {
    /// Whether `line` (already trimmed) is plausibly a code.
    pub fn looks_like_code(&self, line: &str) -> bool {
        match self {
            Self::Numeric => !line.is_empty() && line.chars().all(|c| c.is_ascii_digit()),
            Self::Alphanumeric => {
                !line.is_empty()
                    && line
                        .chars()
                        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            }
            Self::None => true,
        }
    }
}

impl fmt::Display for HeaderRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Numeric => "numeric",
            Self::Alphanumeric => "alphanumeric",
            Self::None => "none",
        };
        f.write_str(s)
    }
}

impl FromStr for HeaderRule {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "numeric" => Ok(Self::Numeric),
            "alphanumeric" => Ok(Self::Alphanumeric),
            "none" | "disabled" => Ok(Self::None),
            other => Err(format!("unknown header rule: {other}")),
        }
    }
}
