//! Email masking for log output.
//!
//! Employee emails show up in request bodies and in database error text
//! (Postgres echoes `Key (email)=(...)` on unique violations). Anything that
//! may carry one goes through [`Redacted`] before it reaches a log field.

use std::fmt;
use std::sync::LazyLock;

use regex::{Captures, Regex};

static EMAIL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::unwrap_used)]
    Regex::new(r"[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{1,}").unwrap()
});

/// Mask a single address: first character of the local part, then `***`,
/// then the full domain. Input without `@` is masked entirely.
pub fn mask_email(email: &str) -> String {
    match email.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{first}***@{domain}"),
            None => format!("@{domain}"),
        },
        None => "***".to_string(),
    }
}

/// Mask every email address embedded in free text.
pub fn redact(input: &str) -> String {
    EMAIL_REGEX
        .replace_all(input, |caps: &Captures| mask_email(&caps[0]))
        .into_owned()
}

/// Display wrapper that redacts on format.
pub struct Redacted<'a>(pub &'a str);

impl fmt::Display for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&redact(self.0))
    }
}

impl fmt::Debug for Redacted<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}
