/// Database layer for CollegeComps
///
/// # Modules
///
/// - `pool`: SQLite connection pools with health checks
/// - `migrations`: Embedded schema migrations for the users database
/// - Models are in the `models` module at crate root level

pub mod migrations;
pub mod pool;
