//! Semantic string refinements backing JSON Schema `format`.

use chrono::{DateTime, NaiveDate};
use once_cell::sync::Lazy;
use regex::Regex;

// ------- Format policy -------

/// RFC-5322-ish mailbox shape: local part, one `@`, dotted domain. This is a
/// pragmatic acceptance check, not a full grammar.
static EMAIL_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)+$").unwrap()
});

/// Scheme per RFC 3986 followed by a non-empty, whitespace-free remainder.
static URI_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*:\S+$").unwrap()
});

/// Hyphenated hex form, any variant.
static UUID_RX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[0-9a-fA-F]{8}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{4}-[0-9a-fA-F]{12}$")
        .unwrap()
});

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StringFormat {
    Email,
    /// RFC 3339 / ISO-8601 date-time with offset.
    DateTime,
    Uri,
    Uuid,
    /// Calendar date, `YYYY-MM-DD`.
    Date,
}

impl StringFormat {
    /// Map a JSON Schema `format` tag to a refinement. Unknown tags yield
    /// `None`; the compiler treats those as plain strings.
    pub fn parse(tag: &str) -> Option<Self> {
        match tag {
            "email" => Some(Self::Email),
            "date-time" => Some(Self::DateTime),
            "uri" => Some(Self::Uri),
            "uuid" => Some(Self::Uuid),
            "date" => Some(Self::Date),
            _ => None,
        }
    }

    pub fn check(self, s: &str) -> bool {
        match self {
            Self::Email => EMAIL_RX.is_match(s),
            Self::DateTime => DateTime::parse_from_rfc3339(s).is_ok(),
            Self::Uri => URI_RX.is_match(s),
            Self::Uuid => UUID_RX.is_match(s),
            Self::Date => NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        }
    }

    /// Completion for "string is not ...".
    pub fn expected(self) -> &'static str {
        match self {
            Self::Email => "a valid email address",
            Self::DateTime => "an RFC 3339 date-time",
            Self::Uri => "a valid URI",
            Self::Uuid => "a valid UUID",
            Self::Date => "a calendar date (YYYY-MM-DD)",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_shapes() {
        assert!(StringFormat::Email.check("a.user+tag@example.co.uk"));
        assert!(!StringFormat::Email.check("not-an-email"));
        assert!(!StringFormat::Email.check("missing@tld"));
        assert!(!StringFormat::Email.check("two@@example.com"));
    }

    #[test]
    fn date_time_is_rfc3339() {
        assert!(StringFormat::DateTime.check("2024-05-01T12:30:00Z"));
        assert!(StringFormat::DateTime.check("2024-05-01T12:30:00+02:00"));
        assert!(!StringFormat::DateTime.check("2024-05-01"));
        assert!(!StringFormat::DateTime.check("yesterday"));
    }

    #[test]
    fn date_is_calendar_only() {
        assert!(StringFormat::Date.check("1999-12-31"));
        assert!(!StringFormat::Date.check("1999-13-01"));
        assert!(!StringFormat::Date.check("1999-12-31T00:00:00Z"));
    }

    #[test]
    fn uri_requires_scheme() {
        assert!(StringFormat::Uri.check("https://example.com/a?b=c"));
        assert!(StringFormat::Uri.check("mailto:someone@example.com"));
        assert!(!StringFormat::Uri.check("example.com/no-scheme"));
        assert!(!StringFormat::Uri.check("http://has space.com"));
    }

    #[test]
    fn uuid_hyphenated_hex() {
        assert!(StringFormat::Uuid.check("123e4567-e89b-12d3-a456-426614174000"));
        assert!(!StringFormat::Uuid.check("123e4567e89b12d3a456426614174000"));
        assert!(!StringFormat::Uuid.check("123e4567-e89b-12d3-a456-42661417400g"));
    }

    #[test]
    fn unknown_tags_are_none() {
        assert_eq!(StringFormat::parse("hostname"), None);
        assert_eq!(StringFormat::parse("email"), Some(StringFormat::Email));
    }
}
