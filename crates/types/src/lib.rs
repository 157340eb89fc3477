//! Validated primitive types shared across the laybridge workspace.
//!
//! These newtypes enforce the two textual invariants the rest of the system
//! relies on: a lay term used as a lookup/unlearn key is never empty, and a
//! SNOMED code (the identity of a candidate option) is never empty.

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("Text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// Wraps a `String` and ensures it contains at least one non-whitespace
/// character. Input is trimmed of leading and trailing whitespace during
/// construction. Used for lay terms sent as lookup queries and unlearn keys.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// The input is trimmed; if the trimmed result is empty,
    /// `TextError::Empty` is returned.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the inner string as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for NonEmptyText {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl serde::Serialize for NonEmptyText {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for NonEmptyText {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        NonEmptyText::new(&s).map_err(serde::de::Error::custom)
    }
}

/// A SNOMED CT code with guaranteed non-empty content.
///
/// Candidate options are identified by their code; an option whose code is
/// empty is meaningless and gets dropped during normalization, so code-bearing
/// types downstream (options, preview selections) carry this newtype and
/// never need to re-check.
///
/// The wrapper makes no claim about SCTID syntax: the backend is free to hand
/// back codes from any edition or extension, and codes are compared as opaque
/// strings.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SnomedCode(String);

impl SnomedCode {
    /// Creates a new `SnomedCode`, trimming surrounding whitespace.
    ///
    /// Returns `TextError::Empty` if nothing remains after trimming.
    pub fn new(input: impl AsRef<str>) -> Result<Self, TextError> {
        let trimmed = input.as_ref().trim();
        if trimmed.is_empty() {
            return Err(TextError::Empty);
        }
        Ok(Self(trimmed.to_owned()))
    }

    /// Returns the code as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SnomedCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl AsRef<str> for SnomedCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl PartialEq<str> for SnomedCode {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl serde::Serialize for SnomedCode {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> serde::Deserialize<'de> for SnomedCode {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        SnomedCode::new(&s).map_err(serde::de::Error::custom)
    }
}
