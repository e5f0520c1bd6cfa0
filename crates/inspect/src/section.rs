//! Reading embedded property-list sections out of compiled binaries.
//!
//! Helper tools built for SMJobBless carry their Info.plist and launchd.plist
//! as `__TEXT` sections. otool dumps a section in one of two textual
//! encodings; both are reconstructed here into the underlying bytes and then
//! parsed as a property list.

use plist::{Dictionary, Value};
use smbless_common::{CheckError, Result, SectionDefect};
use std::io::Cursor;
use std::path::Path;
use std::process::{Command, Stdio};
use tracing::debug;

pub const TEXT_SEGMENT: &str = "__TEXT";
pub const INFO_PLIST_SECTION: &str = "__info_plist";
pub const LAUNCHD_PLIST_SECTION: &str = "__launchd_plist";

/// Header prefix that marks the hex-annotated dump encoding.
const HEX_DUMP_MARKER: &str = "Contents of";

/// Trait for section dumping.
///
/// Abstracts the otool invocation so tests can feed canned dumps.
pub trait SectionOracle {
    /// Verbose textual dump of `(segment,section)` of the binary at `path`.
    fn dump(&self, path: &Path, segment: &str, section: &str) -> Result<String>;
}

/// Oracle backed by the system otool, pinned to the host architecture.
pub struct Otool {
    arch: &'static str,
}

impl Otool {
    pub fn host() -> Self {
        Self { arch: host_arch() }
    }
}

/// Architecture name as otool spells it.
fn host_arch() -> &'static str {
    match std::env::consts::ARCH {
        "aarch64" => "arm64",
        other => other,
    }
}

impl SectionOracle for Otool {
    fn dump(&self, path: &Path, segment: &str, section: &str) -> Result<String> {
        debug!(
            "otool -V -arch {} -s {} {} {}",
            self.arch,
            segment,
            section,
            path.display()
        );
        let output = Command::new("otool")
            .args(["-V", "-arch", self.arch, "-s", segment, section])
            .arg(path)
            .stderr(Stdio::null())
            .output()?;
        if !output.status.success() {
            return Err(CheckError::SectionUnreadable {
                segment: segment.to_string(),
                section: section.to_string(),
                path: path.to_path_buf(),
            });
        }
        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

/// A dump's payload lines, tagged by the encoding otool chose.
enum SectionDump<'a> {
    /// Each line is an offset, hex byte columns, and an ASCII gutter between
    /// `|` delimiters.
    HexAnnotated(&'a [&'a str]),
    /// The section contents printed verbatim.
    RawText(&'a [&'a str]),
}

impl<'a> SectionDump<'a> {
    /// Pick the encoding from the dump's descriptor line.
    fn classify(header: &str, payload: &'a [&'a str]) -> Self {
        if header.starts_with(HEX_DUMP_MARKER) {
            SectionDump::HexAnnotated(payload)
        } else {
            SectionDump::RawText(payload)
        }
    }

    /// Reassemble the raw section bytes.
    fn to_bytes(&self) -> std::result::Result<Vec<u8>, SectionDefect> {
        match self {
            SectionDump::HexAnnotated(lines) => {
                let mut bytes = Vec::new();
                for line in *lines {
                    let parts: Vec<&str> = line.split('|').collect();
                    if parts.len() != 3 {
                        return Err(SectionDefect::Payload);
                    }
                    let mut columns = parts[0].split_whitespace();
                    // First column is the offset.
                    if columns.next().is_none() {
                        return Err(SectionDefect::Payload);
                    }
                    let mut seen_byte = false;
                    for column in columns {
                        let byte = u8::from_str_radix(column, 16)
                            .map_err(|_| SectionDefect::Payload)?;
                        bytes.push(byte);
                        seen_byte = true;
                    }
                    if !seen_byte {
                        return Err(SectionDefect::Payload);
                    }
                }
                Ok(bytes)
            }
            SectionDump::RawText(lines) => Ok(lines.join("\n").into_bytes()),
        }
    }
}

/// Reconstruct the section bytes from a verbose otool dump.
fn section_bytes(
    dump: &str,
    segment: &str,
    section: &str,
) -> std::result::Result<Vec<u8>, SectionDefect> {
    let lines: Vec<&str> = dump.trim().lines().collect();
    if lines.len() < 3 {
        return Err(SectionDefect::Truncated);
    }
    let header = lines[1].trim();
    if !header.ends_with(&format!("({segment},{section}) section")) {
        return Err(SectionDefect::Header);
    }
    SectionDump::classify(header, &lines[2..]).to_bytes()
}

/// Read a dictionary property list from the named section of a binary.
pub fn read_plist_section(
    oracle: &dyn SectionOracle,
    path: &Path,
    segment: &str,
    section: &str,
) -> Result<Dictionary> {
    let malformed = |defect| CheckError::SectionMalformed {
        segment: segment.to_string(),
        section: section.to_string(),
        defect,
        path: path.to_path_buf(),
    };

    let dump = oracle.dump(path, segment, section)?;
    let data = section_bytes(&dump, segment, section).map_err(malformed)?;
    let value =
        Value::from_reader(Cursor::new(data)).map_err(|_| malformed(SectionDefect::Payload))?;
    value
        .into_dictionary()
        .ok_or_else(|| CheckError::SectionRootNotDictionary {
            segment: segment.to_string(),
            section: section.to_string(),
            path: path.to_path_buf(),
        })
}
