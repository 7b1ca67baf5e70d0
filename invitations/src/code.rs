//! Invite code generation.
//!
//! Codes are short enough to read aloud or type from a text message. The
//! alphabet drops glyphs that are easy to confuse (`0`/`O`, `1`/`I`/`L`).
//! Codes are stored upper-case and every lookup goes through
//! [`normalize_invite_code`] first, so `abcd-2345` finds `ABCD2345`.
//!
//! Randomness alone does not guarantee uniqueness: the service checks
//! candidates against both invitation tables before inserting, and the
//! schema carries a unique index on the code column.

use rand::Rng;

/// Characters a generated code is drawn from.
pub const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of generated codes unless configured otherwise.
pub const DEFAULT_INVITE_CODE_LENGTH: usize = 8;

/// Shortest code accepted on lookup.
pub const MIN_INVITE_CODE_LENGTH: usize = 6;

/// Longest code accepted on lookup.
pub const MAX_INVITE_CODE_LENGTH: usize = 16;

/// Generate a code of the default length.
///
/// # Examples
///
/// ```
/// use carpool_invitations::code::{generate_invite_code, DEFAULT_INVITE_CODE_LENGTH};
///
/// let code = generate_invite_code();
/// assert_eq!(code.len(), DEFAULT_INVITE_CODE_LENGTH);
/// assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
/// ```
#[must_use]
pub fn generate_invite_code() -> String {
    generate_invite_code_with_length(DEFAULT_INVITE_CODE_LENGTH)
}

/// Generate a code of `length` characters.
#[must_use]
pub fn generate_invite_code_with_length(length: usize) -> String {
    let mut rng = rand::thread_rng();
    (0..length)
        .map(|_| char::from(INVITE_CODE_ALPHABET[rng.gen_range(0..INVITE_CODE_ALPHABET.len())]))
        .collect()
}

/// Canonical form used for storage and lookup.
///
/// Strips surrounding whitespace, inner spaces and dashes, and upper-cases.
///
/// # Examples
///
/// ```
/// use carpool_invitations::code::normalize_invite_code;
///
/// assert_eq!(normalize_invite_code("  abcd-2345 "), "ABCD2345");
/// assert_eq!(normalize_invite_code("Public12"), "PUBLIC12");
/// ```
#[must_use]
pub fn normalize_invite_code(code: &str) -> String {
    code.chars()
        .filter(|c| !c.is_whitespace() && *c != '-')
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Whether a normalized code could ever have been issued.
///
/// Lookups of malformed input stop here instead of reaching the store.
/// Any ASCII alphanumeric is allowed so codes issued with a different
/// alphabet (such as `PUBLIC12`) stay valid.
#[must_use]
pub fn is_well_formed(normalized: &str) -> bool {
    (MIN_INVITE_CODE_LENGTH..=MAX_INVITE_CODE_LENGTH).contains(&normalized.len())
        && normalized
            .bytes()
            .all(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
}
