//! Verification of the app/tool trust contract in a built bundle.

use crate::{bundle, manifest};
use plist::Value;
use smbless_common::{CheckError, ProgramKind, Result};
use smbless_inspect::{
    read_plist_section, SectionOracle, SigningOracle, INFO_PLIST_SECTION, LAUNCHD_PLIST_SECTION,
    TEXT_SEGMENT,
};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};

/// The only Info dictionary version SMJobBless tools are built with.
const INFO_DICTIONARY_VERSION: &str = "6.0";

/// Check the SMJobBless setup of the app bundle at `app`.
///
/// The steps mirror the five bullets of the SMJobBless header doc, in order:
/// correctly signed app and tools, a matching `SMPrivilegedExecutables`
/// entry, matching `SMAuthorizedClients` entries, matching launchd job
/// labels, and a tool bundle identifier equal to its job label. The fifth
/// needs no pass of its own: the identifier and the label are each checked
/// against the tool name already.
///
/// Fail-fast: the first violated invariant aborts the run.
pub fn check(app: &Path, signing: &dyn SigningOracle, sections: &dyn SectionOracle) -> Result<()> {
    let tools = check_signatures(app, signing)?;
    check_privileged_executables(app, &tools, signing)?;
    check_embedded_info(app, &tools, signing, sections)?;
    check_embedded_launchd(&tools, sections)?;
    Ok(())
}

/// The app and every bundled tool must be correctly code signed.
fn check_signatures(app: &Path, signing: &dyn SigningOracle) -> Result<Vec<PathBuf>> {
    if !app.is_dir() {
        return Err(CheckError::AppNotFound {
            path: app.to_path_buf(),
        });
    }
    signing.verify(app, ProgramKind::App)?;

    let tools = bundle::discover_tools(app)?;
    for tool in &tools {
        signing.verify(tool, ProgramKind::Tool)?;
    }
    if tools.is_empty() {
        return Err(CheckError::NoToolsFound {
            path: bundle::tool_directory(app),
        });
    }
    Ok(tools)
}

/// The app's `SMPrivilegedExecutables` entry must list exactly the bundled
/// tools, each with its actual designated requirement.
///
/// Requiring equality with the tool's own designated requirement is stricter
/// than the minimum (any requirement the tool satisfies would do), but it
/// preserves the complex generated requirement Xcode builds for Developer ID
/// signed tools instead of accepting a weaker hand-written one.
fn check_privileged_executables(
    app: &Path,
    tools: &[PathBuf],
    signing: &dyn SigningOracle,
) -> Result<()> {
    let mut requirements = BTreeMap::new();
    for tool in tools {
        let requirement = signing.designated_requirement(tool, ProgramKind::Tool)?;
        requirements.insert(bundle::tool_name(tool), requirement);
    }

    let info_path = bundle::info_plist_path(app);
    let info = manifest::read(&info_path)?;
    let declared = info
        .get(manifest::PRIVILEGED_EXECUTABLES_KEY)
        .ok_or_else(|| CheckError::PrivilegedExecutablesNotFound {
            path: info_path.clone(),
        })?;
    let declared =
        declared
            .as_dictionary()
            .ok_or_else(|| CheckError::PrivilegedExecutablesNotDictionary {
                path: info_path.clone(),
            })?;

    let declared_names: BTreeSet<&str> = declared.keys().map(String::as_str).collect();
    let tool_names: BTreeSet<&str> = requirements.keys().map(String::as_str).collect();
    if declared_names != tool_names {
        return Err(CheckError::PrivilegedExecutablesOutOfSync);
    }

    for (name, value) in declared.iter() {
        let actual = &requirements[name];
        if value.as_string() != Some(actual.as_str()) {
            return Err(CheckError::ToolRequirementMismatch {
                actual: actual.clone(),
                declared: render(value),
            });
        }
    }
    Ok(())
}

/// Every tool's embedded Info.plist must identify itself by its filename and
/// authorize exactly this app.
fn check_embedded_info(
    app: &Path,
    tools: &[PathBuf],
    signing: &dyn SigningOracle,
    sections: &dyn SectionOracle,
) -> Result<()> {
    let app_requirement = signing.designated_requirement(app, ProgramKind::App)?;

    for tool in tools {
        let info = read_plist_section(sections, tool, TEXT_SEGMENT, INFO_PLIST_SECTION)?;
        let name = bundle::tool_name(tool);

        if info
            .get(manifest::INFO_DICTIONARY_VERSION_KEY)
            .and_then(Value::as_string)
            != Some(INFO_DICTIONARY_VERSION)
        {
            return Err(CheckError::EmbeddedVersionInvalid { path: tool.clone() });
        }
        if info
            .get(manifest::BUNDLE_IDENTIFIER_KEY)
            .and_then(Value::as_string)
            != Some(name.as_str())
        {
            return Err(CheckError::EmbeddedIdentifierMismatch { path: tool.clone() });
        }

        let clients = info.get(manifest::AUTHORIZED_CLIENTS_KEY).ok_or_else(|| {
            CheckError::AuthorizedClientsNotFound { path: tool.clone() }
        })?;
        let clients = clients
            .as_array()
            .ok_or_else(|| CheckError::AuthorizedClientsNotArray { path: tool.clone() })?;
        if clients.len() != 1 {
            return Err(CheckError::AuthorizedClientsNotSingle { path: tool.clone() });
        }
        if clients[0].as_string() != Some(app_requirement.as_str()) {
            return Err(CheckError::AppRequirementMismatch {
                actual: app_requirement.clone(),
                declared: render(&clients[0]),
                path: tool.clone(),
            });
        }
    }
    Ok(())
}

/// Every tool's embedded launchd job label must match its filename.
fn check_embedded_launchd(tools: &[PathBuf], sections: &dyn SectionOracle) -> Result<()> {
    for tool in tools {
        let launchd = read_plist_section(sections, tool, TEXT_SEGMENT, LAUNCHD_PLIST_SECTION)?;
        let name = bundle::tool_name(tool);
        if launchd.get(manifest::LABEL_KEY).and_then(Value::as_string) != Some(name.as_str()) {
            return Err(CheckError::LabelMismatch { path: tool.clone() });
        }
    }
    Ok(())
}

/// Render a declared manifest value for a mismatch diagnostic.
fn render(value: &Value) -> String {
    value
        .as_string()
        .map(str::to_string)
        .unwrap_or_else(|| format!("{value:?}"))
}
