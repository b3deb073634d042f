//! Use cases - User story orchestration.
//!
//! Each module contains use cases for a specific domain area.

pub mod mass_edit;

pub use mass_edit::MassEditUseCases;
