//! Reading and writing Info.plist files.

use plist::{Dictionary, Value};
use smbless_common::{CheckError, Result};
use std::path::Path;
use tracing::debug;

pub const PRIVILEGED_EXECUTABLES_KEY: &str = "SMPrivilegedExecutables";
pub const AUTHORIZED_CLIENTS_KEY: &str = "SMAuthorizedClients";
pub const BUNDLE_IDENTIFIER_KEY: &str = "CFBundleIdentifier";
pub const INFO_DICTIONARY_VERSION_KEY: &str = "CFBundleInfoDictionaryVersion";
pub const LABEL_KEY: &str = "Label";

/// Read an Info.plist dictionary from `path`.
pub fn read(path: &Path) -> Result<Dictionary> {
    let value = Value::from_file(path).map_err(|_| CheckError::ManifestNotReadable {
        path: path.to_path_buf(),
    })?;
    value
        .into_dictionary()
        .ok_or_else(|| CheckError::ManifestRootNotDictionary {
            path: path.to_path_buf(),
        })
}

/// Rewrite `path` with `info`, serialized as XML.
pub fn write(path: &Path, info: &Dictionary) -> Result<()> {
    debug!("rewriting {}", path.display());
    Value::Dictionary(info.clone())
        .to_file_xml(path)
        .map_err(|_| CheckError::ManifestNotWritable {
            path: path.to_path_buf(),
        })
}
