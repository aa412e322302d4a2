//! Syntactic checks on user-submitted fields

use regex::Regex;
use std::sync::LazyLock;

static EMAIL_RE: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_]+@[a-zA-Z_]+?\.[a-zA-Z]{2,3}$").ok());

static FULL_NAME_RE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z]([- ']?[a-zA-Z]+)+( [a-zA-Z]([- ']?[a-zA-Z]+)*)+$").ok()
});

/// Upper bound on any single text field before the regex runs
const MAX_FIELD_LEN: usize = 254;

fn matches(re: &LazyLock<Option<Regex>>, value: &str) -> bool {
    value.len() <= MAX_FIELD_LEN && re.as_ref().is_some_and(|re| re.is_match(value))
}

pub fn is_valid_email(email: &str) -> bool {
    matches(&EMAIL_RE, email)
}

/// First and last name at least, letters with single `-`, `'` or space separators
pub fn is_valid_full_name(name: &str) -> bool {
    matches(&FULL_NAME_RE, name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_emails() {
        assert!(is_valid_email("u@x.com"));
        assert!(is_valid_email("jane_doe42@mail.io"));

        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("u@x"));
        assert!(!is_valid_email("u@x.comma"));
        assert!(!is_valid_email("two@@x.com"));
        assert!(!is_valid_email(" u@x.com"));
    }

    #[test]
    fn test_full_names() {
        assert!(is_valid_full_name("Jane Doe"));
        assert!(is_valid_full_name("Mary-Jane O'Neil"));
        assert!(is_valid_full_name("Jean Claude Van Damme"));

        assert!(!is_valid_full_name("Jane"));
        assert!(!is_valid_full_name("Jane  Doe"));
        assert!(!is_valid_full_name("J4ne Doe"));
        assert!(!is_valid_full_name(""));
    }

    #[test]
    fn test_oversized_field_rejected() {
        let long = format!("{}@x.com", "a".repeat(MAX_FIELD_LEN));
        assert!(!is_valid_email(&long));
    }
}
