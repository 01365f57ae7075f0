//! Contact-information redaction for mentorship chat.
//!
//! Mentors and students must not exchange private contact details through the
//! platform, so every message body passes through [`redact`] before it is
//! persisted or broadcast.

use regex::Regex;
use std::sync::LazyLock;

/// Placeholder inserted in place of an email address.
pub const EMAIL_PLACEHOLDER: &str = "[EMAIL REDACTED]";

/// Placeholder inserted in place of a phone number.
pub const PHONE_PLACEHOLDER: &str = "[PHONE NUMBER REDACTED]";

static EMAIL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").expect("Invalid email regex"));

/// Optional `+` country code, then 3/3/4 digit groups separated by spaces,
/// dots or dashes, with optional parentheses around the area code.
static PHONE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\+\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").expect("Invalid phone regex"));

/// Replaces email addresses and phone numbers in `content` with fixed
/// placeholders, leaving everything else untouched.
///
/// The email pass runs first; the phone pass then scans the partially
/// redacted text. The placeholders contain no digits, so a phone-shaped
/// sequence inside an already-redacted email can never be mangled further.
/// Pure and deterministic: the same input always yields the same output, and
/// input without matches is returned unchanged.
///
/// # Examples
/// ```
/// use alumniconnect_chat::domain::redaction::redact;
///
/// assert_eq!(redact("contact me at a@b.com"), "contact me at [EMAIL REDACTED]");
/// assert_eq!(redact("no private info here"), "no private info here");
/// ```
#[must_use]
pub fn redact(content: &str) -> String {
    let scrubbed = EMAIL_REGEX.replace_all(content, EMAIL_PLACEHOLDER);
    PHONE_REGEX.replace_all(&scrubbed, PHONE_PLACEHOLDER).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redacts_email() {
        assert_eq!(redact("contact me at a@b.com"), "contact me at [EMAIL REDACTED]");
    }

    #[test]
    fn test_redacts_phone() {
        assert_eq!(redact("call 555-123-4567"), "call [PHONE NUMBER REDACTED]");
    }

    #[test]
    fn test_clean_text_unchanged() {
        assert_eq!(redact("no private info here"), "no private info here");
    }

    #[test]
    fn test_redacts_phone_formats() {
        for input in ["555.123.4567", "5551234567", "(555)123-4567", "(555) 123-4567", "+1 555 123 4567"] {
            assert_eq!(redact(input), "[PHONE NUMBER REDACTED]", "format not redacted: {input}");
        }
    }

    #[test]
    fn test_redacts_longer_email() {
        assert_eq!(
            redact("reach me at john.doe99+mentor@alumni.example.edu please"),
            "reach me at [EMAIL REDACTED] please"
        );
    }

    #[test]
    fn test_redacts_multiple_occurrences() {
        let scrubbed = redact("a@b.com or c@d.org or 555-123-4567");
        assert_eq!(scrubbed, "[EMAIL REDACTED] or [EMAIL REDACTED] or [PHONE NUMBER REDACTED]");
    }

    #[test]
    fn test_phone_digits_inside_email_are_not_mangled() {
        // The email pass must consume the whole address before the phone pass runs.
        assert_eq!(redact("5551234567@example.com"), "[EMAIL REDACTED]");
    }

    #[test]
    fn test_redaction_is_idempotent() {
        let once = redact("write to a@b.com or call 555-123-4567");
        assert_eq!(redact(&once), once);
    }

    #[test]
    fn test_preserves_surrounding_text() {
        assert_eq!(
            redact("my email is a@b.com, thanks!"),
            "my email is [EMAIL REDACTED], thanks!"
        );
    }
}
