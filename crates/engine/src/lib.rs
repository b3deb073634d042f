//! TrainerHub Engine library.
//!
//! Server-side mass-edit pipeline for the TrainerHub community site.
//!
//! ## Structure
//!
//! - `use_cases/` - Mass-edit pipeline (builder, executor, species stage, sessions)
//! - `stores/` - In-memory session storage
//! - `infrastructure/` - External dependency implementations (ports + adapters)
//! - `api/` - HTTP entry points
//! - `app` - Application composition

pub mod api;
pub mod app;
pub mod infrastructure;
pub mod stores;
pub mod use_cases;

pub use app::App;
