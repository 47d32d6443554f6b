// ABOUTME: Validated full git commit hash.
// ABOUTME: Image tags, container labels, and state entries all carry the full hash.

use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseCommitHashError {
    #[error("commit hash cannot be empty")]
    Empty,

    #[error("commit hash must be 40 characters, got {0}")]
    WrongLength(usize),

    #[error("invalid character in commit hash: '{0}'")]
    InvalidChar(char),
}

/// A full 40-character git commit hash.
///
/// Revisions (branches, tags, short hashes) are resolved to this before any
/// image is tagged or container labeled, so the rest of the system only ever
/// deals in full hashes.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CommitHash(String);

impl CommitHash {
    pub fn new(value: &str) -> Result<Self, ParseCommitHashError> {
        if value.is_empty() {
            return Err(ParseCommitHashError::Empty);
        }
        if value.len() != 40 {
            return Err(ParseCommitHashError::WrongLength(value.len()));
        }
        for c in value.chars() {
            if !c.is_ascii_hexdigit() || c.is_ascii_uppercase() {
                return Err(ParseCommitHashError::InvalidChar(c));
            }
        }
        Ok(Self(value.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form used in container names and log lines.
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl fmt::Display for CommitHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_full_hash() {
        let hash = CommitHash::new("abc1234def5678abc1234def5678abc1234def56").unwrap();
        assert_eq!(hash.short(), "abc1234");
    }

    #[test]
    fn rejects_short_hash() {
        assert!(matches!(
            CommitHash::new("abc1234"),
            Err(ParseCommitHashError::WrongLength(7))
        ));
    }

    #[test]
    fn rejects_non_hex() {
        assert!(CommitHash::new("zzz1234def5678abc1234def5678abc1234def56").is_err());
    }
}
