//! Deriving trust-contract manifest entries from a built, signed app.

use crate::{bundle, manifest};
use plist::{Dictionary, Value};
use smbless_common::{CheckError, ProgramKind, Result};
use smbless_inspect::SigningOracle;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Read requirements from the built app and rewrite the supplied source
/// Info.plist files so the trust contract will hold.
///
/// Only files whose current value differs (compared order-independently) are
/// rewritten; running twice against an unchanged build updates nothing the
/// second time. Returns the paths that were rewritten.
pub fn setreq(
    app: &Path,
    app_info_path: &Path,
    tool_info_paths: &[PathBuf],
    signing: &dyn SigningOracle,
) -> Result<Vec<PathBuf>> {
    if !app.is_dir() {
        return Err(CheckError::AppNotFound {
            path: app.to_path_buf(),
        });
    }
    if !app_info_path.is_file() {
        return Err(CheckError::ManifestNotFound {
            kind: ProgramKind::App,
            path: app_info_path.to_path_buf(),
        });
    }
    for path in tool_info_paths {
        if !path.is_file() {
            return Err(CheckError::ManifestNotFound {
                kind: ProgramKind::Tool,
                path: path.clone(),
            });
        }
    }

    let app_requirement = signing.designated_requirement(app, ProgramKind::App)?;

    let tools = bundle::discover_tools(app)?;
    let mut requirements = BTreeMap::new();
    for tool in &tools {
        let requirement = signing.designated_requirement(tool, ProgramKind::Tool)?;
        requirements.insert(bundle::tool_name(tool), requirement);
    }

    let found = requirements.len();
    let supplied = tool_info_paths.len();
    if found > supplied {
        return Err(CheckError::MoreToolsThanManifests {
            found,
            supplied,
            path: bundle::tool_directory(app),
        });
    }
    if found < supplied {
        return Err(CheckError::FewerToolsThanManifests {
            found,
            supplied,
            path: bundle::tool_directory(app),
        });
    }

    // Propose the app-side map. Each source manifest's bundle identifier must
    // name a binary in the tool directory: tool filenames double as bundle
    // identifiers.
    let mut proposed = BTreeMap::new();
    let mut sources = Vec::new();
    for path in tool_info_paths {
        let info = manifest::read(path)?;
        let identifier = info
            .get(manifest::BUNDLE_IDENTIFIER_KEY)
            .ok_or_else(|| CheckError::IdentifierNotFound { path: path.clone() })?;
        let identifier = identifier
            .as_string()
            .ok_or_else(|| CheckError::IdentifierNotString { path: path.clone() })?;
        let requirement =
            requirements
                .get(identifier)
                .ok_or_else(|| CheckError::IdentifierUnmatched {
                    identifier: identifier.to_string(),
                    path: path.clone(),
                })?;
        proposed.insert(identifier.to_string(), requirement.clone());
        sources.push((path.clone(), info));
    }

    let mut updated = Vec::new();

    // App side.
    let mut app_info = manifest::read(app_info_path)?;
    let needs_update = match app_info.get(manifest::PRIVILEGED_EXECUTABLES_KEY) {
        None => true,
        Some(current) => {
            let current = current.as_dictionary().ok_or_else(|| {
                CheckError::PrivilegedExecutablesNotDictionary {
                    path: app_info_path.to_path_buf(),
                }
            })?;
            !executables_match(current, &proposed)
        }
    };
    if needs_update {
        let mut entry = Dictionary::new();
        for (identifier, requirement) in &proposed {
            entry.insert(identifier.clone(), Value::String(requirement.clone()));
        }
        app_info.insert(
            manifest::PRIVILEGED_EXECUTABLES_KEY.to_string(),
            Value::Dictionary(entry),
        );
        manifest::write(app_info_path, &app_info)?;
        updated.push(app_info_path.to_path_buf());
    }

    // Tool side: a single-element client list carrying the app requirement.
    for (path, mut info) in sources {
        let needs_update = match info.get(manifest::AUTHORIZED_CLIENTS_KEY) {
            None => true,
            Some(current) => {
                let current = current.as_array().ok_or_else(|| {
                    CheckError::SourceAuthorizedClientsNotArray { path: path.clone() }
                })?;
                !clients_match(current, &app_requirement)
            }
        };
        if needs_update {
            info.insert(
                manifest::AUTHORIZED_CLIENTS_KEY.to_string(),
                Value::Array(vec![Value::String(app_requirement.clone())]),
            );
            manifest::write(&path, &info)?;
            updated.push(path);
        }
    }

    Ok(updated)
}

/// Order-independent comparison of the on-disk executables map against the
/// proposed one.
fn executables_match(current: &Dictionary, proposed: &BTreeMap<String, String>) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    proposed.iter().all(|(identifier, requirement)| {
        current.get(identifier).and_then(Value::as_string) == Some(requirement.as_str())
    })
}

/// Order-independent comparison of the on-disk client list against the single
/// desired entry.
fn clients_match(current: &[Value], app_requirement: &str) -> bool {
    let mut entries = Vec::with_capacity(current.len());
    for value in current {
        match value.as_string() {
            Some(entry) => entries.push(entry),
            None => return false,
        }
    }
    entries.sort_unstable();
    entries == [app_requirement]
}
