use std::fmt;

use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// An admission code: the opaque, case-sensitive primary key of a pass.
///
/// A `Code` is always in normalized form: leading and trailing whitespace is
/// removed and the result is non-empty and at most [`Code::MAX_LEN`] bytes.
/// Two raw inputs that differ only in surrounding whitespace parse to the
/// same `Code`; inputs that differ in case do not.
#[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Code(String);

impl Code {
    /// Maximum length of a normalized code, in bytes.
    pub const MAX_LEN: usize = 256;

    /// Normalize and validate a raw code.
    pub fn parse(raw: &str) -> Result<Self, TypeError> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Err(TypeError::Empty);
        }
        if trimmed.len() > Self::MAX_LEN {
            return Err(TypeError::TooLong {
                len: trimmed.len(),
                max: Self::MAX_LEN,
            });
        }
        Ok(Self(trimmed.to_string()))
    }

    /// The normalized code string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Length of the normalized code in bytes.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always `false`: a `Code` cannot be empty.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Code({:?})", self.0)
    }
}

impl fmt::Display for Code {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for Code {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl TryFrom<String> for Code {
    type Error = TypeError;

    fn try_from(raw: String) -> Result<Self, Self::Error> {
        Self::parse(&raw)
    }
}

impl TryFrom<&str> for Code {
    type Error = TypeError;

    fn try_from(raw: &str) -> Result<Self, Self::Error> {
        Self::parse(raw)
    }
}

impl From<Code> for String {
    fn from(code: Code) -> Self {
        code.0
    }
}

/// Generate a random alphanumeric code of `len` characters.
///
/// `len` is clamped to `1..=Code::MAX_LEN`.
pub fn generate_code<R: Rng>(rng: &mut R, len: usize) -> Code {
    let len = len.clamp(1, Code::MAX_LEN);
    let s: String = (0..len)
        .map(|_| char::from(rng.sample(Alphanumeric)))
        .collect();
    Code(s)
}
