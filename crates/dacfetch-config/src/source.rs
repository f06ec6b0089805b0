use std::{fmt, path::PathBuf};

/// The public nuget.org v3 feed, used when no configuration declares sources.
pub const NUGET_ORG_NAME: &str = "nuget.org";
pub const NUGET_ORG_URL: &str = "https://api.nuget.org/v3/index.json";

/// Credentials for an authenticated package source.
#[derive(Clone, PartialEq, Eq)]
pub struct SourceCredentials {
    pub username: String,
    pub password: String,
}

impl fmt::Debug for SourceCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceCredentials")
            .field("username", &self.username)
            .field("password", &"********")
            .finish()
    }
}

/// Where a package source lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocation {
    /// An HTTP(S) feed. `v3` feeds are addressed through their service index.
    Http { url: String, v3: bool },
    /// A directory of `.nupkg` files.
    Folder(PathBuf),
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceLocation::Http { url, .. } => write!(f, "{url}"),
            SourceLocation::Folder(path) => write!(f, "{}", path.display()),
        }
    }
}

/// One configured package source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PackageSource {
    /// Key the source was declared under.
    pub name: String,
    pub location: SourceLocation,
    pub credentials: Option<SourceCredentials>,
}

impl PackageSource {
    /// Builds a source from a configured value.
    ///
    /// Values starting with `http://` or `https://` are HTTP feeds; a feed is
    /// treated as v3 when `protocol_version` is 3 or its URL ends with
    /// `.json`. Anything else is a folder path, resolved by the caller.
    pub fn from_value(
        name: impl Into<String>,
        value: &str,
        protocol_version: Option<u32>,
        folder: impl FnOnce(&str) -> PathBuf,
    ) -> Self {
        let location = if is_http(value) {
            let v3 = protocol_version == Some(3)
                || value.trim_end_matches('/').to_ascii_lowercase().ends_with(".json");
            SourceLocation::Http {
                url: value.to_string(),
                v3,
            }
        } else {
            SourceLocation::Folder(folder(value))
        };

        Self {
            name: name.into(),
            location,
            credentials: None,
        }
    }

    pub fn nuget_org() -> Self {
        Self {
            name: NUGET_ORG_NAME.to_string(),
            location: SourceLocation::Http {
                url: NUGET_ORG_URL.to_string(),
                v3: true,
            },
            credentials: None,
        }
    }

    pub fn with_credentials(mut self, credentials: Option<SourceCredentials>) -> Self {
        self.credentials = credentials;
        self
    }
}

/// Formats as the source location, the form used in diagnostics.
impl fmt::Display for PackageSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.location)
    }
}

fn is_http(value: &str) -> bool {
    let lower = value.to_ascii_lowercase();
    lower.starts_with("http://") || lower.starts_with("https://")
}
