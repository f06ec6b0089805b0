//! Reading a single `NuGet.Config` file.
//!
//! Only the sections that affect where packages are fetched from are kept:
//! `packageSources`, `disabledPackageSources` and `packageSourceCredentials`.
//! Everything else in the file is ignored.

use std::{
    fs,
    path::{Path, PathBuf},
};

use roxmltree::{Document, Node};
use tracing::{trace, warn};

use crate::error::{ConfigError, Result};

/// File names looked for in each directory, in order.
pub const CONFIG_FILE_NAMES: [&str; 3] = ["NuGet.Config", "nuget.config", "NuGet.config"];

/// One item of an `<add>`/`<clear>` list section, in document order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SectionItem {
    Clear,
    Add {
        key: String,
        value: String,
        protocol_version: Option<u32>,
    },
}

/// Credentials declared for one source, before variable expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialEntry {
    pub username: Option<String>,
    pub clear_text_password: Option<String>,
    pub has_encrypted_password: bool,
}

/// The parts of a `NuGet.Config` file relevant to package sources.
#[derive(Debug, Clone)]
pub struct NuGetConfigFile {
    path: PathBuf,
    package_sources: Option<Vec<SectionItem>>,
    disabled_sources: Vec<SectionItem>,
    credentials: Vec<(String, CredentialEntry)>,
}

impl NuGetConfigFile {
    /// Reads and parses the file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|err| {
            ConfigError::Io {
                path: path.to_path_buf(),
                source: err,
            }
        })?;
        Self::parse(path, &content)
    }

    /// Parses `content` as if it were read from `path`.
    pub fn parse(path: &Path, content: &str) -> Result<Self> {
        let document = Document::parse(content).map_err(|err| {
            ConfigError::Xml {
                path: path.to_path_buf(),
                source: err,
            }
        })?;

        let root = document.root_element();
        if !root.has_tag_name("configuration") {
            return Err(ConfigError::MissingRoot {
                path: path.to_path_buf(),
            });
        }

        let mut config = Self {
            path: path.to_path_buf(),
            package_sources: None,
            disabled_sources: Vec::new(),
            credentials: Vec::new(),
        };

        for section in root.children().filter(Node::is_element) {
            match section.tag_name().name() {
                "packageSources" => {
                    config
                        .package_sources
                        .get_or_insert_with(Vec::new)
                        .extend(section_items(section));
                }
                "disabledPackageSources" => {
                    config.disabled_sources.extend(section_items(section));
                }
                "packageSourceCredentials" => {
                    for source in section.children().filter(Node::is_element) {
                        let name = decode_element_name(source.tag_name().name());
                        let entry = credential_entry(source);
                        if entry.has_encrypted_password && entry.clear_text_password.is_none() {
                            warn!(
                                "Encrypted password for source '{}' in {} is not supported and will be ignored",
                                name,
                                path.display()
                            );
                        }
                        config.credentials.push((name, entry));
                    }
                }
                _ => {}
            }
        }

        trace!(path = %path.display(), "parsed NuGet config");
        Ok(config)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Directory that relative source paths in this file resolve against.
    pub fn directory(&self) -> &Path {
        self.path.parent().unwrap_or(Path::new("."))
    }

    /// The `packageSources` items, or `None` if the file has no such section.
    pub fn package_sources(&self) -> Option<&[SectionItem]> {
        self.package_sources.as_deref()
    }

    pub fn disabled_sources(&self) -> &[SectionItem] {
        &self.disabled_sources
    }

    pub fn credentials(&self) -> &[(String, CredentialEntry)] {
        &self.credentials
    }
}

/// Returns the first config file present in `dir`.
pub fn find_in_dir(dir: &Path) -> Option<PathBuf> {
    CONFIG_FILE_NAMES
        .iter()
        .map(|name| dir.join(name))
        .find(|path| path.is_file())
}

fn section_items(section: Node) -> Vec<SectionItem> {
    section
        .children()
        .filter(Node::is_element)
        .filter_map(|item| {
            match item.tag_name().name() {
                "clear" => Some(SectionItem::Clear),
                "add" => {
                    let key = item.attribute("key")?;
                    let value = item.attribute("value").unwrap_or_default();
                    Some(SectionItem::Add {
                        key: key.to_string(),
                        value: value.to_string(),
                        protocol_version: item
                            .attribute("protocolVersion")
                            .and_then(|v| v.trim().parse().ok()),
                    })
                }
                _ => None,
            }
        })
        .collect()
}

fn credential_entry(source: Node) -> CredentialEntry {
    let mut entry = CredentialEntry::default();

    for item in source.children().filter(|n| n.has_tag_name("add")) {
        let (Some(key), Some(value)) = (item.attribute("key"), item.attribute("value")) else {
            continue;
        };

        if key.eq_ignore_ascii_case("Username") {
            entry.username = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("ClearTextPassword") {
            entry.clear_text_password = Some(value.to_string());
        } else if key.eq_ignore_ascii_case("Password") {
            entry.has_encrypted_password = true;
        }
    }

    entry
}

/// Decodes `_xHHHH_` escapes used to put arbitrary source names into XML
/// element names.
pub fn decode_element_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut rest = name;

    while let Some(pos) = rest.find("_x") {
        out.push_str(&rest[..pos]);
        let candidate = &rest[pos..];

        let decoded = candidate
            .get(2..6)
            .filter(|_| candidate.as_bytes().get(6) == Some(&b'_'))
            .and_then(|hex| u32::from_str_radix(hex, 16).ok())
            .and_then(char::from_u32);

        match decoded {
            Some(ch) => {
                out.push(ch);
                rest = &candidate[7..];
            }
            None => {
                out.push_str("_x");
                rest = &candidate[2..];
            }
        }
    }

    out.push_str(rest);
    out
}
