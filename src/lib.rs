//! Parts library tooling: alias resolution, rule and schema checks, template
//! based library creation and per-part script generation.

pub mod alias;
pub mod check;
pub mod error;
pub mod expr;
pub mod generate;
pub mod library;
pub mod render;
pub mod template;

pub use check::{CheckOutcome, CheckReport, ErrorMap, check_all};
pub use error::{LibraryError, LibraryResult};
pub use library::{Library, Part};
