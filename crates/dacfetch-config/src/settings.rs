//! Resolving the effective package sources for a project.
//!
//! Config files are collected from the project root up to the filesystem
//! root, plus the per-user config, and merged from the lowest priority
//! (user config) to the highest (closest to the project). A `<clear />`
//! drops everything merged before it.

use std::{
    env,
    path::{Path, PathBuf},
};

use dacfetch_utils::path::{expand_percent_vars, home_dir, resolve_relative_to};
use tracing::{debug, trace};

use crate::{
    error::{ConfigError, Result},
    nuget_config::{find_in_dir, CredentialEntry, NuGetConfigFile, SectionItem},
    source::{PackageSource, SourceCredentials},
};

/// Overrides the location of the per-user config file.
pub const USER_CONFIG_ENV: &str = "DACFETCH_NUGET_CONFIG";

/// Returns the path of the per-user NuGet config file.
pub fn user_config_path() -> PathBuf {
    if let Some(path) = env::var_os(USER_CONFIG_ENV) {
        return PathBuf::from(path);
    }

    if cfg!(windows) {
        if let Some(appdata) = env::var_os("APPDATA") {
            return PathBuf::from(appdata).join("NuGet").join("NuGet.Config");
        }
    }

    home_dir().join(".nuget").join("NuGet").join("NuGet.Config")
}

/// The effective, ordered list of package sources.
#[derive(Debug, Clone)]
pub struct SourceSettings {
    sources: Vec<PackageSource>,
    config_files: Vec<PathBuf>,
}

struct DeclaredSource {
    key: String,
    value: String,
    protocol_version: Option<u32>,
    base_dir: PathBuf,
}

#[derive(Default)]
struct Merger {
    declared_any: bool,
    sources: Vec<DeclaredSource>,
    disabled: Vec<(String, bool)>,
    credentials: Vec<(String, CredentialEntry)>,
}

impl Merger {
    fn apply(&mut self, file: &NuGetConfigFile) {
        if let Some(items) = file.package_sources() {
            self.declared_any = true;
            for item in items {
                match item {
                    SectionItem::Clear => self.sources.clear(),
                    SectionItem::Add {
                        key,
                        value,
                        protocol_version,
                    } => {
                        let declared = DeclaredSource {
                            key: key.clone(),
                            value: value.clone(),
                            protocol_version: *protocol_version,
                            base_dir: file.directory().to_path_buf(),
                        };
                        match self
                            .sources
                            .iter_mut()
                            .find(|s| s.key.eq_ignore_ascii_case(key))
                        {
                            Some(existing) => *existing = declared,
                            None => self.sources.push(declared),
                        }
                    }
                }
            }
        }

        for item in file.disabled_sources() {
            match item {
                SectionItem::Clear => self.disabled.clear(),
                SectionItem::Add {
                    key,
                    value,
                    ..
                } => {
                    let disabled = value.trim().eq_ignore_ascii_case("true");
                    upsert(&mut self.disabled, key, disabled);
                }
            }
        }

        for (name, entry) in file.credentials() {
            upsert(&mut self.credentials, name, entry.clone());
        }
    }

    fn finish(self) -> Result<Vec<PackageSource>> {
        if !self.declared_any {
            debug!("no package sources configured, using nuget.org");
            return Ok(vec![PackageSource::nuget_org()]);
        }

        let mut sources = Vec::with_capacity(self.sources.len());
        for declared in self.sources {
            let is_disabled = self
                .disabled
                .iter()
                .any(|(key, disabled)| *disabled && key.eq_ignore_ascii_case(&declared.key));
            if is_disabled {
                trace!(source = %declared.key, "skipping disabled source");
                continue;
            }

            if declared.value.trim().is_empty() {
                return Err(ConfigError::InvalidSource {
                    source_name: declared.key,
                    reason: "the source has no value".into(),
                });
            }

            let credentials = self
                .credentials
                .iter()
                .find(|(name, _)| name.eq_ignore_ascii_case(&declared.key))
                .map(|(_, entry)| resolve_credentials(&declared.key, entry))
                .transpose()?
                .flatten();

            let base_dir = declared.base_dir;
            let source = PackageSource::from_value(
                declared.key,
                declared.value.trim(),
                declared.protocol_version,
                |value| resolve_relative_to(&base_dir, value).unwrap_or_else(|_| base_dir.join(value)),
            )
            .with_credentials(credentials);

            sources.push(source);
        }

        Ok(sources)
    }
}

fn upsert<T>(entries: &mut Vec<(String, T)>, key: &str, value: T) {
    match entries
        .iter_mut()
        .find(|(existing, _)| existing.eq_ignore_ascii_case(key))
    {
        Some((_, slot)) => *slot = value,
        None => entries.push((key.to_string(), value)),
    }
}

fn resolve_credentials(
    source_name: &str,
    entry: &CredentialEntry,
) -> Result<Option<SourceCredentials>> {
    let (Some(username), Some(password)) = (&entry.username, &entry.clear_text_password) else {
        return Ok(None);
    };

    let expand = |value: &str| {
        expand_percent_vars(value).map_err(|err| {
            ConfigError::InvalidSource {
                source_name: source_name.to_string(),
                reason: err.to_string(),
            }
        })
    };

    Ok(Some(SourceCredentials {
        username: expand(username)?,
        password: expand(password)?,
    }))
}

impl SourceSettings {
    /// Discovers and merges config files for a project rooted at
    /// `project_root`.
    pub fn discover(project_root: &Path) -> Result<Self> {
        let mut files = Vec::new();

        let user_config = user_config_path();
        if user_config.is_file() {
            files.push(user_config);
        }

        let mut hierarchy = project_root
            .ancestors()
            .filter_map(find_in_dir)
            .collect::<Vec<_>>();
        hierarchy.reverse();
        files.extend(hierarchy);

        Self::merge(files)
    }

    /// Uses exactly the config file at `path`.
    pub fn load_file(path: &Path) -> Result<Self> {
        Self::merge(vec![path.to_path_buf()])
    }

    /// Uses `locations` as the sources, in order, ignoring config files.
    ///
    /// Relative folder paths resolve against `base_dir`.
    pub fn from_locations<S: AsRef<str>>(locations: &[S], base_dir: &Path) -> Result<Self> {
        let sources = locations
            .iter()
            .enumerate()
            .map(|(idx, location)| {
                let location = location.as_ref().trim();
                let path = resolve_relative_to(base_dir, location).map_err(|err| {
                    ConfigError::InvalidSource {
                        source_name: format!("source{}", idx + 1),
                        reason: err.to_string(),
                    }
                })?;
                Ok(PackageSource::from_value(
                    format!("source{}", idx + 1),
                    location,
                    None,
                    |_| path,
                ))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            sources,
            config_files: Vec::new(),
        })
    }

    fn merge(files: Vec<PathBuf>) -> Result<Self> {
        let mut merger = Merger::default();

        for path in &files {
            debug!("loading NuGet config {}", path.display());
            let file = NuGetConfigFile::load(path)?;
            merger.apply(&file);
        }

        Ok(Self {
            sources: merger.finish()?,
            config_files: files,
        })
    }

    pub fn sources(&self) -> &[PackageSource] {
        &self.sources
    }

    pub fn into_sources(self) -> Vec<PackageSource> {
        self.sources
    }

    /// Config files that contributed, lowest priority first.
    pub fn config_files(&self) -> &[PathBuf] {
        &self.config_files
    }
}
