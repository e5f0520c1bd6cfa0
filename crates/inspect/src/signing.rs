//! Signature verification and requirement extraction via codesign.

use smbless_common::{CheckError, ProgramKind, Result};
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

/// Marker prefix codesign prints in front of the designated requirement.
const DESIGNATED_MARKER: &str = "designated => ";

/// Shape violation in `codesign -d -r -` output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequirementDefect {
    /// No output at all.
    Empty,
    /// More than one line; the dump must carry exactly the designated
    /// requirement.
    MultipleLines,
    /// The single line does not start with the `designated => ` marker.
    MissingMarker,
}

/// Extract the designated requirement from a requirement dump.
///
/// The dump must be exactly one line carrying the marker; the requirement is
/// everything after it.
pub fn parse_designated_requirement(
    output: &str,
) -> std::result::Result<&str, RequirementDefect> {
    let mut lines = output.lines();
    let first = lines.next().ok_or(RequirementDefect::Empty)?;
    if lines.next().is_some() {
        return Err(RequirementDefect::MultipleLines);
    }
    first
        .strip_prefix(DESIGNATED_MARKER)
        .ok_or(RequirementDefect::MissingMarker)
}

/// Trait for signature verification.
///
/// Abstracts the codesign invocations so tests can substitute a fake oracle
/// without spawning processes.
pub trait SigningOracle {
    /// Strict signature verification; `Ok(())` iff the signature is valid.
    fn verify(&self, path: &Path, kind: ProgramKind) -> Result<()>;

    /// The designated requirement of the signed code at `path`.
    fn designated_requirement(&self, path: &Path, kind: ProgramKind) -> Result<String>;
}

/// Oracle backed by the system codesign tool.
pub struct Codesign;

impl Codesign {
    pub fn new() -> Self {
        Self
    }
}

impl Default for Codesign {
    fn default() -> Self {
        Self::new()
    }
}

impl SigningOracle for Codesign {
    fn verify(&self, path: &Path, kind: ProgramKind) -> Result<()> {
        // The second -v enables the extended consistency checks, including
        // "does the code satisfy its own designated requirement", not just
        // "is the program signed at all".
        debug!("codesign -v -v {}", path.display());
        let status = Command::new("codesign")
            .args(["-v", "-v"])
            .arg(path)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()?;
        if !status.success() {
            return Err(CheckError::SignatureInvalid {
                kind,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn designated_requirement(&self, path: &Path, kind: ProgramKind) -> Result<String> {
        debug!("codesign -d -r - {}", path.display());
        let output = Command::new("codesign")
            .args(["-d", "-r", "-"])
            .arg(path)
            .stderr(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(CheckError::RequirementUnreadable {
                kind,
                path: path.to_path_buf(),
            });
        }
        let text = String::from_utf8_lossy(&output.stdout);
        match parse_designated_requirement(&text) {
            Ok(requirement) => Ok(requirement.to_string()),
            Err(_) => Err(CheckError::RequirementMalformed {
                kind,
                path: path.to_path_buf(),
            }),
        }
    }
}
