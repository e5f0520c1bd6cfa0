//! Program kind definitions.

use std::fmt;

/// Which side of the trust contract a binary is on.
///
/// Only used to word diagnostics; the checks themselves don't branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramKind {
    App,
    Tool,
}

impl fmt::Display for ProgramKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProgramKind::App => write!(f, "app"),
            ProgramKind::Tool => write!(f, "tool"),
        }
    }
}
