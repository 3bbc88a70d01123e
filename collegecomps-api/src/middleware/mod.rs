/// Middleware modules for the API server
///
/// Session authentication lives in `collegecomps_shared::auth::middleware`
/// and is attached per route group in [`crate::app::build_router`].

pub mod security;
