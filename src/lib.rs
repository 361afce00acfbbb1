//! nfe-organizer - sorts Brazilian electronic invoice (NF-e) XML files
//!
//! This library classifies NF-e XML documents (invoice, event, or
//! unrecognized), files invoices under `<issuer>/<year>/<month>/<day>/<type>`
//! and events under a shared events directory, and can undo a run from the
//! history it leaves in the destination.

pub mod cli;
pub mod config;
pub mod file_organizer;
pub mod nfe;
pub mod output;
pub mod prompt;
pub mod undo;

pub use config::{CompiledFilters, ConfigError, OrganizerConfig};
pub use file_organizer::{FileOrganizer, OrganizeError, Placement};
pub use nfe::{Classification, DocumentKind, InvoiceData, OperationType, classify_file};
pub use undo::{UndoManager, UndoReport};

pub use cli::{OrganizeCommand, OrganizeReport, organize_directory, run_cli};
