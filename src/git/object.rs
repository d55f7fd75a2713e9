//! Object IDs and signatures as they appear in git's text output

use chrono::{DateTime, FixedOffset};
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::core::error::{GitError, Result};

/// Hex object ID (SHA-1 or SHA-256), stored lowercase
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Abbreviated form for display
    pub fn short(&self) -> &str {
        &self.0[..7]
    }
}

impl FromStr for ObjectId {
    type Err = GitError;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let valid_len = s.len() == 40 || s.len() == 64;
        if !valid_len || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(GitError::InvalidObjectId(s.to_string()));
        }
        Ok(ObjectId(s.to_ascii_lowercase()))
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl Serialize for ObjectId {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.0)
    }
}

/// Author or committer identity with its timestamp
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Signature {
    pub name: String,
    pub email: String,
    pub when: DateTime<FixedOffset>,
}

impl Signature {
    /// Parse the value of an `author`/`committer` header:
    /// `Name <email> 1700000000 +0100`
    pub fn parse(value: &str) -> Result<Self> {
        let malformed = || GitError::ParseFailure(format!("malformed signature: {:?}", value));

        let open = value.find('<').ok_or_else(malformed)?;
        let close = open + value[open..].find('>').ok_or_else(malformed)?;

        let name = value[..open].trim().to_string();
        let email = value[open + 1..close].to_string();

        let mut rest = value[close + 1..].split_whitespace();
        let seconds: i64 = rest
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(malformed)?;
        let offset = rest.next().and_then(parse_tz_offset).ok_or_else(malformed)?;
        let when = DateTime::from_timestamp(seconds, 0)
            .ok_or_else(malformed)?
            .with_timezone(&offset);

        Ok(Self { name, email, when })
    }
}

/// Parse a `+hhmm`/`-hhmm` zone
fn parse_tz_offset(tz: &str) -> Option<FixedOffset> {
    if tz.len() != 5 || !tz.is_ascii() {
        return None;
    }
    let sign = match &tz[..1] {
        "+" => 1,
        "-" => -1,
        _ => return None,
    };
    let hours: i32 = tz[1..3].parse().ok()?;
    let minutes: i32 = tz[3..5].parse().ok()?;
    FixedOffset::east_opt(sign * (hours * 3600 + minutes * 60))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHA: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn test_object_id_parse() {
        let id: ObjectId = SHA.parse().unwrap();
        assert_eq!(id.as_str(), SHA);
        assert_eq!(id.short(), "0123456");
        assert_eq!(id.to_string(), SHA);
    }

    #[test]
    fn test_object_id_lowercases_and_trims() {
        let id: ObjectId = format!(" {}\n", SHA.to_uppercase()).parse().unwrap();
        assert_eq!(id.as_str(), SHA);
    }

    #[test]
    fn test_object_id_sha256() {
        let long = "a".repeat(64);
        assert!(long.parse::<ObjectId>().is_ok());
    }

    #[test]
    fn test_object_id_rejects_garbage() {
        assert!("HEAD".parse::<ObjectId>().is_err());
        assert!("z".repeat(40).parse::<ObjectId>().is_err());
        assert!(SHA[..39].parse::<ObjectId>().is_err());
    }

    #[test]
    fn test_object_id_serializes_as_string() {
        let id: ObjectId = SHA.parse().unwrap();
        assert_eq!(serde_json::to_string(&id).unwrap(), format!("\"{}\"", SHA));
    }

    #[test]
    fn test_signature_parse() {
        let sig = Signature::parse("Jane Doe <jane@example.com> 1577880000 +0100").unwrap();
        assert_eq!(sig.name, "Jane Doe");
        assert_eq!(sig.email, "jane@example.com");
        assert_eq!(sig.when.timestamp(), 1577880000);
        assert_eq!(sig.when.offset().local_minus_utc(), 3600);
    }

    #[test]
    fn test_signature_negative_offset() {
        let sig = Signature::parse("A <a@b> 0 -0530").unwrap();
        assert_eq!(sig.when.offset().local_minus_utc(), -(5 * 3600 + 30 * 60));
    }

    #[test]
    fn test_signature_empty_name() {
        let sig = Signature::parse("<bot@ci> 10 +0000").unwrap();
        assert_eq!(sig.name, "");
        assert_eq!(sig.email, "bot@ci");
    }

    #[test]
    fn test_signature_malformed() {
        assert!(Signature::parse("no email here 10 +0000").is_err());
        assert!(Signature::parse("A <a@b> notanumber +0000").is_err());
        assert!(Signature::parse("A <a@b> 10 0000").is_err());
    }
}
