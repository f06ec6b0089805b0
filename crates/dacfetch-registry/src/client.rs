use std::{
    collections::HashMap,
    io::Read,
    sync::{Arc, Mutex},
    time::Duration,
};

use base64::{engine::general_purpose::STANDARD, Engine};
use dacfetch_config::source::SourceCredentials;
use tracing::trace;
use ureq::{
    http::{header, Response},
    typestate::WithoutBody,
    Agent, Body, Proxy, RequestBuilder,
};

use crate::{
    error::{ErrorContext, RegistryError, Result},
    ProgressCallback,
};

/// Download progress reported while a package body is read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    Starting { total: u64 },
    Chunk { current: u64, total: u64 },
    Complete { total: u64 },
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub user_agent: Option<String>,
    pub proxy: Option<Proxy>,
    pub timeout: Option<Duration>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            user_agent: Some(concat!("dacfetch/", env!("CARGO_PKG_VERSION")).into()),
            proxy: None,
            timeout: None,
        }
    }
}

impl ClientConfig {
    /// Builds an HTTP `Agent` from this config.
    ///
    /// Status codes are never turned into errors by the agent; callers
    /// inspect them, since a 404 means "not in this feed".
    pub fn build(&self) -> Agent {
        let mut config = ureq::Agent::config_builder()
            .proxy(self.proxy.clone())
            .timeout_global(self.timeout)
            .http_status_as_error(false);

        if let Some(user_agent) = &self.user_agent {
            config = config.user_agent(user_agent);
        }

        config.build().into()
    }
}

/// HTTP client shared by all feeds of one run.
///
/// Cloning is cheap; clones share the agent and the service index cache.
#[derive(Clone)]
pub struct RegistryClient {
    agent: Agent,
    service_indexes: Arc<Mutex<HashMap<String, String>>>,
}

impl RegistryClient {
    pub fn new(config: &ClientConfig) -> Self {
        Self {
            agent: config.build(),
            service_indexes: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Starts a GET request, adding basic authentication when credentials
    /// are given.
    pub fn get(
        &self,
        url: &str,
        credentials: Option<&SourceCredentials>,
    ) -> RequestBuilder<WithoutBody> {
        let req = self.agent.get(url);
        match credentials {
            Some(credentials) => req.header(header::AUTHORIZATION, basic_auth(credentials)),
            None => req,
        }
    }

    /// Sends a GET request and returns the response whatever its status.
    pub fn call(
        &self,
        url: &str,
        credentials: Option<&SourceCredentials>,
    ) -> Result<Response<Body>> {
        trace!(url, "GET");
        self.get(url, credentials).call().map_err(|err| {
            RegistryError::Network {
                url: url.to_string(),
                source: Box::new(err),
            }
        })
    }

    /// Returns the cached resource resolved for `index_url`, resolving it
    /// with `resolve` on first use.
    pub fn cached_resource<F>(&self, index_url: &str, resolve: F) -> Result<String>
    where
        F: FnOnce() -> Result<String>,
    {
        if let Some(found) = self.lock_cache().get(index_url) {
            return Ok(found.clone());
        }

        let resolved = resolve()?;
        self.lock_cache()
            .insert(index_url.to_string(), resolved.clone());
        Ok(resolved)
    }

    fn lock_cache(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.service_indexes
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for RegistryClient {
    fn default() -> Self {
        Self::new(&ClientConfig::default())
    }
}

fn basic_auth(credentials: &SourceCredentials) -> String {
    let token = STANDARD.encode(format!(
        "{}:{}",
        credentials.username, credentials.password
    ));
    format!("Basic {token}")
}

const MAX_PREALLOCATION: u64 = 64 * 1024 * 1024;

/// Determines the body size from `Content-Length`, or 0 when unknown.
pub fn content_length(resp: &Response<Body>) -> u64 {
    resp.headers()
        .get(header::CONTENT_LENGTH)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.parse().ok())
        .unwrap_or(0)
}

/// Reads `reader` to the end, reporting progress along the way.
pub fn read_with_progress<R: Read>(
    mut reader: R,
    total: u64,
    url: &str,
    on_progress: Option<&ProgressCallback>,
) -> Result<Vec<u8>> {
    if let Some(cb) = on_progress {
        cb(Progress::Starting {
            total,
        });
    }

    let mut bytes = Vec::with_capacity(total.min(MAX_PREALLOCATION) as usize);
    let mut buffer = [0u8; 8192];

    loop {
        let n = reader
            .read(&mut buffer)
            .with_context(|| format!("reading response from {url}"))?;
        if n == 0 {
            break;
        }

        bytes.extend_from_slice(&buffer[..n]);

        if let Some(cb) = on_progress {
            cb(Progress::Chunk {
                current: bytes.len() as u64,
                total,
            });
        }
    }

    if let Some(cb) = on_progress {
        cb(Progress::Complete {
            total: bytes.len() as u64,
        });
    }

    Ok(bytes)
}
