/// Subscription tier and admin checks
///
/// Feature gating is by subscription tier. Tiers are ordered, so a check for
/// `Free` passes for everyone and a check for `Premium` passes only for paying
/// users. Admin access is separate from tiers: a user is an admin when their
/// role is `admin` or their email belongs to the configured staff domain.
///
/// # Example
///
/// ```
/// use collegecomps_shared::auth::authorization::{require_tier, SubscriptionTier};
/// use collegecomps_shared::auth::middleware::AuthContext;
///
/// let auth = AuthContext {
///     user_id: 1,
///     email: "student@example.com".to_string(),
///     name: None,
///     tier: SubscriptionTier::Free,
///     role: "user".to_string(),
/// };
///
/// assert!(require_tier(&auth, SubscriptionTier::Free).is_ok());
/// assert!(require_tier(&auth, SubscriptionTier::Premium).is_err());
/// ```

use serde::{Deserialize, Serialize};

use super::middleware::AuthContext;

/// Error type for authorization checks
#[derive(Debug, thiserror::Error)]
pub enum AuthzError {
    /// Caller's tier is below the feature's tier
    #[error("{feature} requires a {required} subscription")]
    InsufficientTier {
        required: SubscriptionTier,
        feature: String,
    },

    /// Caller is not staff
    #[error("Admin access required")]
    NotAdmin,
}

/// Subscription tier
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionTier {
    Free,
    Premium,
}

impl SubscriptionTier {
    /// Parses a stored tier value
    ///
    /// Unknown values are treated as `Free` so a bad row never grants access.
    pub fn from_db(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "premium" => SubscriptionTier::Premium,
            _ => SubscriptionTier::Free,
        }
    }

    /// Stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionTier::Free => "free",
            SubscriptionTier::Premium => "premium",
        }
    }

    /// Checks if this tier grants at least `required`
    pub fn has_minimum_tier(&self, required: SubscriptionTier) -> bool {
        *self >= required
    }

    /// Support ticket priority for this tier
    pub fn support_priority(&self) -> &'static str {
        match self {
            SubscriptionTier::Premium => "normal",
            SubscriptionTier::Free => "low",
        }
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Checks if an account is staff
///
/// `admin_domain` is matched against the part of the email after `@`,
/// case-insensitively. An empty domain disables the domain rule.
pub fn is_admin(role: &str, email: &str, admin_domain: &str) -> bool {
    if role.eq_ignore_ascii_case("admin") {
        return true;
    }

    if admin_domain.is_empty() {
        return false;
    }

    email
        .rsplit_once('@')
        .map(|(_, domain)| domain.eq_ignore_ascii_case(admin_domain.trim_start_matches('@')))
        .unwrap_or(false)
}

/// Requires the caller's tier to be at least `required`
pub fn require_tier(auth: &AuthContext, required: SubscriptionTier) -> Result<(), AuthzError> {
    require_tier_for(auth, required, "This feature")
}

/// Like [`require_tier`] with the feature named in the error message
pub fn require_tier_for(
    auth: &AuthContext,
    required: SubscriptionTier,
    feature: &str,
) -> Result<(), AuthzError> {
    if !auth.tier.has_minimum_tier(required) {
        return Err(AuthzError::InsufficientTier {
            required,
            feature: feature.to_string(),
        });
    }

    Ok(())
}

/// Requires the caller to be staff
pub fn require_admin(auth: &AuthContext, admin_domain: &str) -> Result<(), AuthzError> {
    if !is_admin(&auth.role, &auth.email, admin_domain) {
        return Err(AuthzError::NotAdmin);
    }

    Ok(())
}
