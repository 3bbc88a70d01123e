/// API route handlers
///
/// This module contains all route handlers organized by resource:
///
/// - `health`: Health check endpoint
/// - `auth`: Signup, login, password reset and email verification
/// - `user`: Account, academic profile, onboarding, questionnaire and usage
/// - `alerts`: Premium alert preferences
/// - `salary`: Salary submissions and aggregates
/// - `comparisons`: Saved comparisons, tags and folder moves
/// - `folders`: Comparison folders
/// - `exports`: Share links and CSV/JSON exports
/// - `bookmarks`: Bookmarked colleges
/// - `analytics`: Event tracking and the activity dashboard
/// - `stripe`: Checkout, billing portal and webhook
/// - `support`: Customer support tickets and the inbound email webhook
/// - `admin`: Staff view of the ticket queue
/// - `unsubscribe`: Email preference links

pub mod admin;
pub mod alerts;
pub mod analytics;
pub mod auth;
pub mod bookmarks;
pub mod comparisons;
pub mod exports;
pub mod folders;
pub mod health;
pub mod salary;
pub mod stripe;
pub mod support;
pub mod unsubscribe;
pub mod user;

use crate::error::{ApiError, ApiResult};
use collegecomps_shared::{
    auth::{
        authorization::{require_tier_for, SubscriptionTier},
        middleware::AuthContext,
    },
    email::templates::Recipient,
    models::user::User,
};

/// Trimmed value of an optional field, `None` when absent or blank
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

/// Like [`non_blank`], failing with a 400 carrying `message`
pub(crate) fn required<'a>(value: &'a Option<String>, message: &str) -> ApiResult<&'a str> {
    non_blank(value).ok_or_else(|| ApiError::BadRequest(message.to_string()))
}

/// Requires a premium subscription for `feature`
pub(crate) fn require_premium(auth: &AuthContext, feature: &str) -> ApiResult<()> {
    require_tier_for(auth, SubscriptionTier::Premium, feature).map_err(|e| {
        tracing::debug!(user_id = auth.user_id, error = %e, "Premium feature refused");
        ApiError::Forbidden("Premium subscription required".to_string())
    })
}

/// Email recipient for a user row
pub(crate) fn recipient(user: &User) -> Recipient<'_> {
    Recipient {
        user_id: user.id,
        email: &user.email,
        name: user.name.as_deref(),
    }
}
