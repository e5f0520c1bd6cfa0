//! Filesystem layout of an app bundle that installs privileged helpers.

use smbless_common::{CheckError, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Finder metadata; never a helper tool.
const DS_STORE: &str = ".DS_Store";

/// The app's Info.plist inside a built bundle.
pub fn info_plist_path(app: &Path) -> PathBuf {
    app.join("Contents").join("Info.plist")
}

/// Where a built bundle keeps its privileged helper tools.
pub fn tool_directory(app: &Path) -> PathBuf {
    app.join("Contents").join("Library").join("LaunchServices")
}

/// A tool's name: its filename, which doubles as its bundle identifier.
pub fn tool_name(tool: &Path) -> String {
    tool.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default()
}

/// Enumerate the helper binaries of a built app bundle.
///
/// Entries must be regular files; `.DS_Store` is ignored. Returns the tool
/// paths sorted by name, or fails if the directory is missing or contains a
/// subdirectory.
pub fn discover_tools(app: &Path) -> Result<Vec<PathBuf>> {
    let dir = tool_directory(app);
    if !dir.is_dir() {
        return Err(CheckError::ToolDirectoryNotFound { path: dir });
    }
    let mut tools = Vec::new();
    for entry in fs::read_dir(&dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy() == DS_STORE {
            continue;
        }
        let path = entry.path();
        if !path.is_file() {
            return Err(CheckError::ToolDirectoryHasDirectory { path });
        }
        tools.push(path);
    }
    tools.sort();
    Ok(tools)
}
