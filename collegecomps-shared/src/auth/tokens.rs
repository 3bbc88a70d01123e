/// Credential tokens for password reset, email verification, share links and
/// unsubscribe links
///
/// Reset and verification tokens are mailed to the user in plaintext and only
/// their SHA-256 hash is stored, so a database leak does not expose usable
/// links. Share tokens are public identifiers and are stored as-is.
///
/// # Token Format
///
/// Random bytes from the thread RNG, hex-encoded:
/// - Reset / verification: 32 bytes (64 hex chars)
/// - Share: 16 bytes (32 hex chars)
///
/// Unsubscribe tokens are deterministic: `HMAC-SHA256(secret, user_id)` in hex,
/// so a link stays valid for as long as the signing secret does.
///
/// # Example
///
/// ```
/// use collegecomps_shared::auth::tokens::{generate_token, hash_token, verify_token};
///
/// let (raw, hash) = generate_token(32);
/// assert_eq!(raw.len(), 64);
/// assert_eq!(hash, hash_token(&raw));
/// assert!(verify_token(&raw, &hash));
/// ```

use chrono::{DateTime, Duration, Utc};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha256};

/// Random bytes in a password reset token
pub const RESET_TOKEN_BYTES: usize = 32;

/// Random bytes in an email verification token
pub const VERIFICATION_TOKEN_BYTES: usize = 32;

/// Random bytes in a share token
pub const SHARE_TOKEN_BYTES: usize = 16;

/// Reset links are valid for one hour
pub const RESET_TOKEN_TTL_HOURS: i64 = 1;

/// Verification links are valid for 24 hours
pub const VERIFICATION_TOKEN_TTL_HOURS: i64 = 24;

/// Share links are valid for 30 days
pub const SHARE_TOKEN_TTL_DAYS: i64 = 30;

type HmacSha256 = Hmac<Sha256>;

/// Generates a random token of `bytes` random bytes
///
/// Returns `(raw_hex, sha256_hex)`. The raw value goes to the user, the hash
/// goes to the database.
pub fn generate_token(bytes: usize) -> (String, String) {
    let mut buf = vec![0u8; bytes];
    rand::thread_rng().fill_bytes(&mut buf);

    let raw = hex::encode(buf);
    let hash = hash_token(&raw);

    (raw, hash)
}

/// Hashes a token using SHA-256, hex-encoded (64 characters)
///
/// ```
/// use collegecomps_shared::auth::tokens::hash_token;
///
/// let hash = hash_token("abc");
/// assert_eq!(hash.len(), 64);
/// assert_eq!(hash, hash_token("abc"));
/// ```
pub fn hash_token(raw: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(raw.as_bytes());
    hex::encode(hasher.finalize())
}

/// Checks a raw token against a stored hash in constant time
pub fn verify_token(raw: &str, stored_hash: &str) -> bool {
    constant_time_compare(&hash_token(raw), stored_hash)
}

/// Constant-time string comparison
///
/// Runs over the full length of both inputs when lengths match.
///
/// ```
/// use collegecomps_shared::auth::tokens::constant_time_compare;
///
/// assert!(constant_time_compare("hello", "hello"));
/// assert!(!constant_time_compare("hello", "world"));
/// assert!(!constant_time_compare("hello", "hell"));
/// ```
pub fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.bytes()
        .zip(b.bytes())
        .fold(0u8, |acc, (x, y)| acc | (x ^ y))
        == 0
}

/// A freshly issued reset or verification token
#[derive(Debug, Clone)]
pub struct IssuedToken {
    /// Plaintext token for the email link
    pub raw: String,

    /// SHA-256 hash to persist
    pub hash: String,

    /// Absolute expiry to persist alongside the hash
    pub expires_at: DateTime<Utc>,
}

/// Issues a password reset token expiring in [`RESET_TOKEN_TTL_HOURS`]
pub fn issue_reset_token() -> IssuedToken {
    issue(RESET_TOKEN_BYTES, Duration::hours(RESET_TOKEN_TTL_HOURS))
}

/// Issues an email verification token expiring in
/// [`VERIFICATION_TOKEN_TTL_HOURS`]
pub fn issue_verification_token() -> IssuedToken {
    issue(
        VERIFICATION_TOKEN_BYTES,
        Duration::hours(VERIFICATION_TOKEN_TTL_HOURS),
    )
}

fn issue(bytes: usize, ttl: Duration) -> IssuedToken {
    let (raw, hash) = generate_token(bytes);
    IssuedToken {
        raw,
        hash,
        expires_at: Utc::now() + ttl,
    }
}

/// Generates a share token and its expiry
///
/// Share tokens are looked up directly, so only the raw value is returned.
pub fn generate_share_token() -> (String, DateTime<Utc>) {
    let (raw, _) = generate_token(SHARE_TOKEN_BYTES);
    (raw, Utc::now() + Duration::days(SHARE_TOKEN_TTL_DAYS))
}

/// Signs an unsubscribe token for a user id
pub fn sign_unsubscribe_token(secret: &str, user_id: i64) -> String {
    // HMAC accepts keys of any length, new_from_slice cannot fail here
    let mut mac = match HmacSha256::new_from_slice(secret.as_bytes()) {
        Ok(mac) => mac,
        Err(_) => return String::new(),
    };
    mac.update(user_id.to_string().as_bytes());
    hex::encode(mac.finalize().into_bytes())
}

/// Verifies an unsubscribe token for a user id
pub fn verify_unsubscribe_token(secret: &str, user_id: i64, token: &str) -> bool {
    let Ok(expected) = hex::decode(token) else {
        return false;
    };

    let Ok(mut mac) = HmacSha256::new_from_slice(secret.as_bytes()) else {
        return false;
    };
    mac.update(user_id.to_string().as_bytes());
    mac.verify_slice(&expected).is_ok()
}
