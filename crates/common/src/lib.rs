//! Common types shared across smbless crates.

pub mod error;
pub mod kind;

pub use error::{CheckError, Result, SectionDefect};
pub use kind::ProgramKind;
