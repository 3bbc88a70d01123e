/// Authentication and authorization utilities
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and the length policy
/// - [`jwt`]: Session token issuance and validation
/// - [`tokens`]: Reset, verification, share and unsubscribe tokens
/// - [`middleware`]: Session lookup and the per-request `AuthContext`
/// - [`authorization`]: Subscription tier and admin checks
///
/// # Example
///
/// ```no_run
/// use collegecomps_shared::auth::password::{hash_password, verify_password};
/// use collegecomps_shared::auth::jwt::{create_token, Claims};
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(42, "student@example.com");
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!!")?;
/// # Ok(())
/// # }
/// ```

pub mod authorization;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod tokens;
