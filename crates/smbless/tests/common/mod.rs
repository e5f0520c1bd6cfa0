//! Shared fixtures: fake oracles and a fully wellformed app-bundle layout.
#![allow(dead_code)]

use plist::{Dictionary, Value};
use smbless_common::{CheckError, ProgramKind, Result};
use smbless_inspect::{SectionOracle, SigningOracle, INFO_PLIST_SECTION, LAUNCHD_PLIST_SECTION};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};

pub const APP_REQUIREMENT: &str =
    "identifier \"com.example.app\" and anchor apple generic and certificate leaf[subject.OU] = SKMME9E2Y8";

pub fn tool_requirement(name: &str) -> String {
    format!("identifier \"{name}\" and anchor apple generic")
}

/// Signing oracle answering from a fixed table instead of spawning codesign.
#[derive(Default)]
pub struct FakeSigning {
    requirements: HashMap<PathBuf, String>,
    invalid: HashSet<PathBuf>,
}

impl FakeSigning {
    pub fn set_requirement(&mut self, path: &Path, requirement: &str) {
        self.requirements
            .insert(path.to_path_buf(), requirement.to_string());
    }

    pub fn invalidate(&mut self, path: &Path) {
        self.invalid.insert(path.to_path_buf());
    }
}

impl SigningOracle for FakeSigning {
    fn verify(&self, path: &Path, kind: ProgramKind) -> Result<()> {
        if self.invalid.contains(path) {
            return Err(CheckError::SignatureInvalid {
                kind,
                path: path.to_path_buf(),
            });
        }
        Ok(())
    }

    fn designated_requirement(&self, path: &Path, kind: ProgramKind) -> Result<String> {
        self.requirements
            .get(path)
            .cloned()
            .ok_or_else(|| CheckError::RequirementUnreadable {
                kind,
                path: path.to_path_buf(),
            })
    }
}

/// Section oracle serving canned otool dumps.
#[derive(Default)]
pub struct FakeSections {
    dumps: HashMap<(PathBuf, String), String>,
}

impl FakeSections {
    pub fn set_dump(&mut self, path: &Path, section: &str, dump: String) {
        self.dumps
            .insert((path.to_path_buf(), section.to_string()), dump);
    }
}

impl SectionOracle for FakeSections {
    fn dump(&self, path: &Path, segment: &str, section: &str) -> Result<String> {
        self.dumps
            .get(&(path.to_path_buf(), section.to_string()))
            .cloned()
            .ok_or_else(|| CheckError::SectionUnreadable {
                segment: segment.to_string(),
                section: section.to_string(),
                path: path.to_path_buf(),
            })
    }
}

/// Serialize a dictionary as XML plist text.
pub fn xml(dict: &Dictionary) -> String {
    let mut buf = Vec::new();
    Value::Dictionary(dict.clone())
        .to_writer_xml(&mut buf)
        .unwrap();
    String::from_utf8(buf).unwrap()
}

/// A section dump in otool's raw-text encoding.
pub fn raw_dump(segment: &str, section: &str, content: &str) -> String {
    format!("/tmp/tool:\n({segment},{section}) section\n{content}")
}

/// The same dump in otool's hex-annotated encoding.
pub fn hex_dump(segment: &str, section: &str, data: &[u8]) -> String {
    let mut out = format!("/tmp/tool:\nContents of ({segment},{section}) section\n");
    for (index, chunk) in data.chunks(16).enumerate() {
        let columns: Vec<String> = chunk.iter().map(|b| format!("{b:02x}")).collect();
        let ascii: String = chunk
            .iter()
            .map(|&b| {
                if b.is_ascii_graphic() || b == b' ' {
                    b as char
                } else {
                    '.'
                }
            })
            .collect();
        out.push_str(&format!(
            "{:08x} {} |{}|\n",
            0x100000000u64 + (index * 16) as u64,
            columns.join(" "),
            ascii
        ));
    }
    out
}

/// The embedded Info.plist a wellformed tool carries.
pub fn embedded_info(name: &str, clients: Vec<Value>) -> Dictionary {
    let mut info = Dictionary::new();
    info.insert(
        "CFBundleInfoDictionaryVersion".to_string(),
        Value::String("6.0".to_string()),
    );
    info.insert(
        "CFBundleIdentifier".to_string(),
        Value::String(name.to_string()),
    );
    info.insert("SMAuthorizedClients".to_string(), Value::Array(clients));
    info
}

/// A built app bundle plus oracle answers, with every invariant holding.
pub struct Fixture {
    pub temp: assert_fs::TempDir,
    pub app: PathBuf,
    pub signing: FakeSigning,
    pub sections: FakeSections,
}

impl Fixture {
    pub fn new(tool_names: &[&str]) -> Self {
        let temp = assert_fs::TempDir::new().unwrap();
        let app = temp.path().join("Example.app");
        let tools_dir = app.join("Contents").join("Library").join("LaunchServices");
        std::fs::create_dir_all(&tools_dir).unwrap();

        let mut signing = FakeSigning::default();
        let mut sections = FakeSections::default();
        signing.set_requirement(&app, APP_REQUIREMENT);

        let mut executables = Dictionary::new();
        for name in tool_names {
            let tool = tools_dir.join(name);
            std::fs::write(&tool, b"helper binary").unwrap();
            signing.set_requirement(&tool, &tool_requirement(name));
            executables.insert(name.to_string(), Value::String(tool_requirement(name)));

            let info = embedded_info(name, vec![Value::String(APP_REQUIREMENT.to_string())]);
            sections.set_dump(
                &tool,
                INFO_PLIST_SECTION,
                raw_dump("__TEXT", INFO_PLIST_SECTION, &xml(&info)),
            );

            let mut launchd = Dictionary::new();
            launchd.insert("Label".to_string(), Value::String(name.to_string()));
            sections.set_dump(
                &tool,
                LAUNCHD_PLIST_SECTION,
                hex_dump("__TEXT", LAUNCHD_PLIST_SECTION, xml(&launchd).as_bytes()),
            );
        }

        let mut app_info = Dictionary::new();
        app_info.insert(
            "CFBundleIdentifier".to_string(),
            Value::String("com.example.app".to_string()),
        );
        app_info.insert(
            "SMPrivilegedExecutables".to_string(),
            Value::Dictionary(executables),
        );
        Value::Dictionary(app_info)
            .to_file_xml(app.join("Contents").join("Info.plist"))
            .unwrap();

        Self {
            temp,
            app,
            signing,
            sections,
        }
    }

    pub fn app_info_path(&self) -> PathBuf {
        self.app.join("Contents").join("Info.plist")
    }

    pub fn tool_path(&self, name: &str) -> PathBuf {
        self.app
            .join("Contents")
            .join("Library")
            .join("LaunchServices")
            .join(name)
    }

    pub fn check(&self) -> Result<()> {
        smbless::check(&self.app, &self.signing, &self.sections)
    }

    /// Load, edit, and store the built app's Info.plist.
    pub fn edit_app_info(&self, edit: impl FnOnce(&mut Dictionary)) {
        let path = self.app_info_path();
        let mut info = Value::from_file(&path)
            .unwrap()
            .into_dictionary()
            .unwrap();
        edit(&mut info);
        Value::Dictionary(info).to_file_xml(&path).unwrap();
    }

    /// Replace a tool's embedded Info.plist section.
    pub fn set_info_section(&mut self, name: &str, info: &Dictionary) {
        let tool = self.tool_path(name);
        self.sections.set_dump(
            &tool,
            INFO_PLIST_SECTION,
            raw_dump("__TEXT", INFO_PLIST_SECTION, &xml(info)),
        );
    }

    /// Replace a tool's embedded launchd.plist section.
    pub fn set_launchd_section(&mut self, name: &str, launchd: &Dictionary) {
        let tool = self.tool_path(name);
        self.sections.set_dump(
            &tool,
            LAUNCHD_PLIST_SECTION,
            raw_dump("__TEXT", LAUNCHD_PLIST_SECTION, &xml(launchd)),
        );
    }
}
