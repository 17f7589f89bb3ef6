//! Validated primitive types shared across the odontogram service crates.
//!
//! Values of these types can only be obtained through their checking constructors, so code that
//! receives one never has to re-validate it.

use std::fmt;

/// Errors that can occur when creating validated text types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TextError {
    /// The input text was empty or contained only whitespace
    #[error("text cannot be empty")]
    Empty,
}

/// A string type that guarantees non-empty content.
///
/// The input is trimmed of leading and trailing whitespace during construction, and the trimmed
/// result must contain at least one character. Tooth designations and procedure categories are
/// carried as `NonEmptyText`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct NonEmptyText(String);

impl NonEmptyText {
    /// Creates a new `NonEmptyText` from the given input.
    ///
    /// # Errors
    ///
    /// Returns [`TextError::Empty`] if the input is empty or contains only whitespace.
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

    /// Consumes the wrapper and returns the owned string.
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl fmt::Display for NonEmptyText {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
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

/// The caller identity extracted from a verified credential.
///
/// Only the token subject is trusted; it is used to gate access and to attribute log lines,
/// never for role decisions.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SubjectId(NonEmptyText);

impl SubjectId {
    /// Creates a subject identity from a non-empty subject claim.
    pub fn new(subject: impl AsRef<str>) -> Result<Self, TextError> {
        NonEmptyText::new(subject).map(Self)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_non_empty_text_trims_input() {
        let text = NonEmptyText::new("  18 ").expect("should accept padded text");
        assert_eq!(text.as_str(), "18");
    }

    #[test]
    fn test_non_empty_text_rejects_blank_input() {
        assert_eq!(NonEmptyText::new(""), Err(TextError::Empty));
        assert_eq!(NonEmptyText::new(" \t\n"), Err(TextError::Empty));
    }

    #[test]
    fn test_non_empty_text_deserialise_rejects_blank() {
        let err = serde_json::from_str::<NonEmptyText>("\"   \"");
        assert!(err.is_err(), "blank string should not deserialise");

        let ok: NonEmptyText = serde_json::from_str("\"canal\"").expect("should deserialise");
        assert_eq!(ok.as_str(), "canal");
    }

    #[test]
    fn test_subject_id_requires_content() {
        assert!(SubjectId::new("").is_err());
        let subject = SubjectId::new("dr-silva").expect("should accept subject");
        assert_eq!(subject.to_string(), "dr-silva");
    }
}
