//! Error types shared across the smbless crates.

use crate::kind::ProgramKind;
use std::fmt;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Why a section dump could not be decoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SectionDefect {
    /// Fewer than the three lines every dump starts with.
    Truncated,
    /// The descriptor line does not name the requested segment/section.
    Header,
    /// The payload lines could not be reconstructed or parsed.
    Payload,
}

impl fmt::Display for SectionDefect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SectionDefect::Truncated => write!(f, "truncated dump"),
            SectionDefect::Header => write!(f, "unexpected header"),
            SectionDefect::Payload => write!(f, "undecodable payload"),
        }
    }
}

/// A violated invariant detected by `check` or `setreq`.
///
/// Each variant is one distinct failure; the first one encountered aborts the
/// run. Variants carry the offending path where one exists so the CLI can
/// report `<path>: <message>`.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("app not found")]
    AppNotFound { path: PathBuf },

    #[error("{kind} code signature invalid")]
    SignatureInvalid { kind: ProgramKind, path: PathBuf },

    #[error("{kind} designated requirement unreadable")]
    RequirementUnreadable { kind: ProgramKind, path: PathBuf },

    #[error("{kind} designated requirement malformed")]
    RequirementMalformed { kind: ProgramKind, path: PathBuf },

    #[error("tool directory not found")]
    ToolDirectoryNotFound { path: PathBuf },

    #[error("tool directory contains a directory")]
    ToolDirectoryHasDirectory { path: PathBuf },

    #[error("no tools found")]
    NoToolsFound { path: PathBuf },

    #[error("'Info.plist' not readable")]
    ManifestNotReadable { path: PathBuf },

    #[error("'Info.plist' root must be a dictionary")]
    ManifestRootNotDictionary { path: PathBuf },

    #[error("{kind} 'Info.plist' not found")]
    ManifestNotFound { kind: ProgramKind, path: PathBuf },

    #[error("'Info.plist' not writable")]
    ManifestNotWritable { path: PathBuf },

    #[error("'SMPrivilegedExecutables' not found")]
    PrivilegedExecutablesNotFound { path: PathBuf },

    #[error("'SMPrivilegedExecutables' must be a dictionary")]
    PrivilegedExecutablesNotDictionary { path: PathBuf },

    #[error("'SMPrivilegedExecutables' and tools in 'Contents/Library/LaunchServices' don't match")]
    PrivilegedExecutablesOutOfSync,

    #[error("tool designated requirement ({actual}) doesn't match entry in 'SMPrivilegedExecutables' ({declared})")]
    ToolRequirementMismatch { actual: String, declared: String },

    #[error("tool {segment} / {section} section unreadable")]
    SectionUnreadable {
        segment: String,
        section: String,
        path: PathBuf,
    },

    #[error("tool {segment} / {section} section dump malformed ({defect})")]
    SectionMalformed {
        segment: String,
        section: String,
        defect: SectionDefect,
        path: PathBuf,
    },

    #[error("tool {segment} / {section} property list root must be a dictionary")]
    SectionRootNotDictionary {
        segment: String,
        section: String,
        path: PathBuf,
    },

    #[error("'CFBundleInfoDictionaryVersion' in tool __TEXT / __info_plist section must be '6.0'")]
    EmbeddedVersionInvalid { path: PathBuf },

    #[error("'CFBundleIdentifier' in tool __TEXT / __info_plist section must match tool name")]
    EmbeddedIdentifierMismatch { path: PathBuf },

    #[error("'SMAuthorizedClients' in tool __TEXT / __info_plist section not found")]
    AuthorizedClientsNotFound { path: PathBuf },

    #[error("'SMAuthorizedClients' in tool __TEXT / __info_plist section must be an array")]
    AuthorizedClientsNotArray { path: PathBuf },

    #[error("'SMAuthorizedClients' in tool __TEXT / __info_plist section must have one entry")]
    AuthorizedClientsNotSingle { path: PathBuf },

    #[error("app designated requirement ({actual}) doesn't match entry in 'SMAuthorizedClients' ({declared})")]
    AppRequirementMismatch {
        actual: String,
        declared: String,
        path: PathBuf,
    },

    #[error("'Label' in tool __TEXT / __launchd_plist section must match tool name")]
    LabelMismatch { path: PathBuf },

    #[error("tool directory has more tools ({found}) than you've supplied tool 'Info.plist' paths ({supplied})")]
    MoreToolsThanManifests {
        found: usize,
        supplied: usize,
        path: PathBuf,
    },

    #[error("tool directory has fewer tools ({found}) than you've supplied tool 'Info.plist' paths ({supplied})")]
    FewerToolsThanManifests {
        found: usize,
        supplied: usize,
        path: PathBuf,
    },

    #[error("'CFBundleIdentifier' not found")]
    IdentifierNotFound { path: PathBuf },

    #[error("'CFBundleIdentifier' must be a string")]
    IdentifierNotString { path: PathBuf },

    #[error("'CFBundleIdentifier' ({identifier}) doesn't match any tool in 'Contents/Library/LaunchServices'")]
    IdentifierUnmatched { identifier: String, path: PathBuf },

    #[error("'SMAuthorizedClients' must be an array")]
    SourceAuthorizedClientsNotArray { path: PathBuf },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CheckError {
    /// The offending path, for diagnostics that have one.
    pub fn path(&self) -> Option<&Path> {
        use CheckError::*;
        match self {
            AppNotFound { path }
            | SignatureInvalid { path, .. }
            | RequirementUnreadable { path, .. }
            | RequirementMalformed { path, .. }
            | ToolDirectoryNotFound { path }
            | ToolDirectoryHasDirectory { path }
            | NoToolsFound { path }
            | ManifestNotReadable { path }
            | ManifestRootNotDictionary { path }
            | ManifestNotFound { path, .. }
            | ManifestNotWritable { path }
            | PrivilegedExecutablesNotFound { path }
            | PrivilegedExecutablesNotDictionary { path }
            | SectionUnreadable { path, .. }
            | SectionMalformed { path, .. }
            | SectionRootNotDictionary { path, .. }
            | EmbeddedVersionInvalid { path }
            | EmbeddedIdentifierMismatch { path }
            | AuthorizedClientsNotFound { path }
            | AuthorizedClientsNotArray { path }
            | AuthorizedClientsNotSingle { path }
            | AppRequirementMismatch { path, .. }
            | LabelMismatch { path }
            | MoreToolsThanManifests { path, .. }
            | FewerToolsThanManifests { path, .. }
            | IdentifierNotFound { path }
            | IdentifierNotString { path }
            | IdentifierUnmatched { path, .. }
            | SourceAuthorizedClientsNotArray { path } => Some(path),
            PrivilegedExecutablesOutOfSync | ToolRequirementMismatch { .. } | Io(_) => None,
        }
    }
}

/// Result type alias using [`CheckError`].
pub type Result<T> = std::result::Result<T, CheckError>;
