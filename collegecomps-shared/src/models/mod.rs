/// Database models for CollegeComps
///
/// One module per table, each with its queries as associated functions
/// taking a `&SqlitePool`.
///
/// # Models
///
/// - `user`: Accounts, credential reset and verification state, subscription
/// - `profile`: Academic profile (scores, budget, interests)
/// - `onboarding`: Post-signup onboarding answers
/// - `questionnaire`: Recommendation questionnaire answers
/// - `alert_preference`: Premium alert settings
/// - `saved_comparison`: Saved college comparisons with tags and folder
/// - `comparison_folder`: Folders for saved comparisons
/// - `shared_comparison`: Public share links
/// - `bookmark`: Bookmarked colleges
/// - `salary_submission`: Crowd-sourced salary reports and aggregates
/// - `support_ticket`: Support tickets and their message threads
/// - `analytics`: Per-user event log
///
/// # Example
///
/// ```no_run
/// use collegecomps_shared::models::user::{User, CreateUser};
/// use collegecomps_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let new_user = CreateUser {
///     email: "student@example.com".to_string(),
///     password_hash: Some("$argon2id$...".to_string()),
///     name: Some("Sam Student".to_string()),
///     provider: "credentials".to_string(),
/// };
///
/// let user = User::create(&pool, new_user).await?;
/// # Ok(())
/// # }
/// ```

pub mod alert_preference;
pub mod analytics;
pub mod bookmark;
pub mod comparison_folder;
pub mod onboarding;
pub mod profile;
pub mod questionnaire;
pub mod salary_submission;
pub mod saved_comparison;
pub mod shared_comparison;
pub mod support_ticket;
pub mod user;
