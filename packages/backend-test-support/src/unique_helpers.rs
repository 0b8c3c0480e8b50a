//! Unique test data so tests sharing one database never collide.

use ulid::Ulid;

/// `{prefix}-{ulid}`, lowercased.
///
/// ```
/// use backend_test_support::unique_helpers::unique_str;
///
/// let a = unique_str("emp");
/// let b = unique_str("emp");
/// assert_ne!(a, b);
/// assert!(a.starts_with("emp-"));
/// ```
pub fn unique_str(prefix: &str) -> String {
    format!("{}-{}", prefix, Ulid::new().to_string().to_lowercase())
}

/// A unique, already-normalized email: `{prefix}-{ulid}@example.test`.
///
/// The ULID is lowercased so the value round-trips unchanged through the
/// service's email normalization.
///
/// ```
/// use backend_test_support::unique_helpers::unique_email;
///
/// let email = unique_email("ada");
/// assert!(email.starts_with("ada-"));
/// assert!(email.ends_with("@example.test"));
/// assert_eq!(email, email.to_lowercase());
/// ```
pub fn unique_email(prefix: &str) -> String {
    format!("{}@example.test", unique_str(prefix))
}

/// A unique last name, for list-filter tests that must only see their own rows.
pub fn unique_name(prefix: &str) -> String {
    let id = Ulid::new().to_string();
    // Keep it well under the 100 character name limit.
    format!("{prefix}{}", &id[id.len() - 10..])
}
