//! Phone number type.

use core::fmt;

use serde::{Deserialize, Serialize};

/// Errors that can occur when parsing a [`Phone`].
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PhoneError {
    /// The input string is empty.
    #[error("phone number cannot be empty")]
    Empty,
    /// The input contains something other than digits and separators.
    #[error("phone number may only contain digits, spaces, dashes, dots and parentheses")]
    InvalidCharacters,
    /// Too few or too many digits.
    #[error("phone number must have between {min} and {max} digits")]
    InvalidLength {
        /// Minimum digit count.
        min: usize,
        /// Maximum digit count.
        max: usize,
    },
}

/// A phone number in international form.
///
/// Separators are dropped and a leading `+` is added when missing, so the
/// provider's SMS attribute always receives an E.164-looking value.
///
/// ```
/// use brightpath_core::Phone;
///
/// assert_eq!(Phone::parse("447700183406").unwrap().as_str(), "+447700183406");
/// assert_eq!(Phone::parse("+447700183406").unwrap().as_str(), "+447700183406");
/// assert_eq!(Phone::parse("+1 (415) 555-0100").unwrap().as_str(), "+14155550100");
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(try_from = "String", into = "String")]
pub struct Phone(String);

impl Phone {
    /// Minimum number of digits (short national numbers with country code).
    pub const MIN_DIGITS: usize = 7;
    /// Maximum number of digits allowed by E.164.
    pub const MAX_DIGITS: usize = 15;

    /// Parse and normalize a phone number.
    ///
    /// # Errors
    ///
    /// Returns an error if the input is empty, contains letters or other
    /// symbols, or has a digit count outside 7..=15.
    pub fn parse(s: &str) -> Result<Self, PhoneError> {
        let s = s.trim();
        if s.is_empty() {
            return Err(PhoneError::Empty);
        }

        let rest = s.strip_prefix('+').unwrap_or(s);
        let mut digits = String::with_capacity(rest.len() + 1);
        digits.push('+');
        for c in rest.chars() {
            match c {
                '0'..='9' => digits.push(c),
                ' ' | '-' | '.' | '(' | ')' => {}
                _ => return Err(PhoneError::InvalidCharacters),
            }
        }

        let count = digits.len() - 1;
        if !(Self::MIN_DIGITS..=Self::MAX_DIGITS).contains(&count) {
            return Err(PhoneError::InvalidLength {
                min: Self::MIN_DIGITS,
                max: Self::MAX_DIGITS,
            });
        }

        Ok(Self(digits))
    }

    /// Returns the normalized number, always starting with `+`.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Phone {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Phone {
    type Error = PhoneError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Phone> for String {
    fn from(phone: Phone) -> Self {
        phone.0
    }
}

impl AsRef<str> for Phone {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_adds_plus_prefix() {
        let phone = Phone::parse("447700183406").unwrap();
        assert_eq!(phone.as_str(), "+447700183406");
    }

    #[test]
    fn test_keeps_existing_plus() {
        let phone = Phone::parse("+447700183406").unwrap();
        assert_eq!(phone.as_str(), "+447700183406");
    }

    #[test]
    fn test_strips_separators() {
        let phone = Phone::parse(" +44 7700-183.406 ").unwrap();
        assert_eq!(phone.as_str(), "+447700183406");
    }

    #[test]
    fn test_rejects_letters() {
        assert_eq!(
            Phone::parse("+44 call me"),
            Err(PhoneError::InvalidCharacters)
        );
        assert_eq!(Phone::parse("++44770018"), Err(PhoneError::InvalidCharacters));
    }

    #[test]
    fn test_rejects_bad_length() {
        assert!(matches!(
            Phone::parse("12345"),
            Err(PhoneError::InvalidLength { .. })
        ));
        assert!(matches!(
            Phone::parse("1234567890123456"),
            Err(PhoneError::InvalidLength { .. })
        ));
    }

    #[test]
    fn test_rejects_empty() {
        assert_eq!(Phone::parse("  "), Err(PhoneError::Empty));
    }
}
