//! OCLC number normalisation.
//!
//! FOLIO stores OCLC identifiers as raw strings carrying whatever prefix the
//! cataloguing source used, e.g. "(OCoLC)0012345", "ocm00000001", "on1234567890".
//! WorldCat's holdings endpoints want the bare control number, and the
//! current-number lookup fails outright for numbers with leading zeros, so
//! every identifier is normalised before it reaches the network.

use std::fmt;

use thiserror::Error;

/// The raw identifier contained no usable (non-zero) digits.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("malformed OCLC number: {raw:?}")]
pub struct MalformedIdentifierError {
    pub raw: String,
}

/// A normalised OCLC control number: ASCII digits only, no leading zero.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OclcNumber(String);

impl OclcNumber {
    /// Normalise a raw FOLIO identifier into an OCLC number.
    ///
    /// Skips everything before the first non-zero digit, then takes the run
    /// of digits that follows. Trailing junk (whitespace, a stray suffix) is
    /// dropped.
    ///
    /// "(OCoLC)0012345" → "12345", "ocm00000001 " → "1"
    pub fn parse(raw: &str) -> Result<Self, MalformedIdentifierError> {
        let start = raw
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() && *c != '0')
            .map(|(i, _)| i)
            .ok_or_else(|| MalformedIdentifierError {
                raw: raw.to_string(),
            })?;

        let rest = &raw[start..];
        let end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());

        Ok(Self(rest[..end].to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OclcNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for OclcNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn norm(raw: &str) -> String {
        OclcNumber::parse(raw).unwrap().to_string()
    }

    #[test]
    fn strips_vendor_prefix_and_leading_zeros() {
        assert_eq!(norm("(OCoLC)0012345"), "12345");
        assert_eq!(norm("ocm00000001 "), "1");
        assert_eq!(norm("ocn000987654"), "987654");
        assert_eq!(norm("on1234567890"), "1234567890");
    }

    #[test]
    fn bare_number_unchanged() {
        assert_eq!(norm("12345"), "12345");
        assert_eq!(norm("0067890"), "67890");
    }

    #[test]
    fn interior_zeros_preserved() {
        assert_eq!(norm("(OCoLC)00100200"), "100200");
    }

    #[test]
    fn trailing_suffix_dropped() {
        assert_eq!(norm("(OCoLC)12345 "), "12345");
        assert_eq!(norm("(OCoLC)12345\t"), "12345");
    }

    #[test]
    fn prefix_zeros_digits_property() {
        for prefix in ["", "(OCoLC)", "ocm", "ocn", "on", "  "] {
            for zeros in ["", "0", "000000"] {
                for digits in ["1", "42", "90210", "1000000"] {
                    let raw = format!("{prefix}{zeros}{digits}");
                    assert_eq!(norm(&raw), digits, "input {raw:?}");
                }
            }
        }
    }

    #[test]
    fn no_usable_digit_is_malformed() {
        for raw in ["", "(OCoLC)", "ocm", "000", "(OCoLC)0000 "] {
            let err = OclcNumber::parse(raw).unwrap_err();
            assert_eq!(err.raw, raw);
        }
    }

    #[test]
    fn error_names_the_raw_input() {
        let err = OclcNumber::parse("(OCoLC)").unwrap_err();
        assert_eq!(err.to_string(), "malformed OCLC number: \"(OCoLC)\"");
    }
}
