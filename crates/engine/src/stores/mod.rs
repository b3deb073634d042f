//! In-memory state storage modules.
//!
//! Stores manage runtime state that lives only as long as the process:
//! - `MassEditStore` - Open mass-edit sessions, including suspended batches

pub mod mass_edit;

pub use mass_edit::{MassEditStore, SharedSession};
