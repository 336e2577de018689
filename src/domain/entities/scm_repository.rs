//! Resolved repositories

use crate::domain::value_objects::scm_url::ScmUrl;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use url::Url;

/// Provider-specific connection details, parsed once from the specific part of
/// a repository URL
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderRepository {
    /// Location handed to the tool (remote URL or local path)
    pub url: String,
    /// Access protocol (`https`, `ssh`, `file`, ...)
    pub protocol: Option<String>,
    /// Server host
    pub host: Option<String>,
    /// Server port
    pub port: Option<u16>,
    /// Repository path or root on the server
    pub path: Option<String>,
    /// Module or sub-project inside the repository
    pub module: Option<String>,
    /// Account name
    pub user: Option<String>,
    /// Account password
    #[serde(skip_serializing)]
    pub password: Option<String>,
    /// Free-form provider data
    pub extras: BTreeMap<String, String>,
}

impl ProviderRepository {
    /// A descriptor that only carries a location
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    /// Build a descriptor from a standard URL, splitting out protocol, host,
    /// port, path and credentials. Returns `None` when `location` is not a URL.
    pub fn from_url(location: &str) -> Option<Self> {
        let parsed = Url::parse(location).ok()?;

        let user = match parsed.username() {
            "" => None,
            name => Some(name.to_string()),
        };
        let password = parsed.password().map(str::to_string);

        let mut clean = parsed.clone();
        // Credentials travel as separate fields, never inside the location
        let _ = clean.set_username("");
        let _ = clean.set_password(None);

        Some(Self {
            url: clean.to_string(),
            protocol: Some(parsed.scheme().to_string()),
            host: parsed.host_str().map(str::to_string),
            port: parsed.port(),
            path: Some(parsed.path().to_string()).filter(|path| !path.is_empty()),
            module: None,
            user,
            password,
            extras: BTreeMap::new(),
        })
    }

    /// Set the module
    pub fn with_module(mut self, module: impl Into<String>) -> Self {
        self.module = Some(module.into());
        self
    }

    /// Set the account name
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.user = Some(user.into());
        self
    }

    /// Set the account password
    pub fn with_password(mut self, password: impl Into<String>) -> Self {
        self.password = Some(password.into());
        self
    }

    /// Add a free-form value
    pub fn with_extra(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extras.insert(key.into(), value.into());
        self
    }

    /// Look up a free-form value
    pub fn extra(&self, key: &str) -> Option<&str> {
        self.extras.get(key).map(String::as_str)
    }
}

impl fmt::Display for ProviderRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.url)?;
        if let Some(module) = &self.module {
            write!(f, " module={}", module)?;
        }
        if let Some(user) = &self.user {
            write!(f, " user={}", user)?;
        }
        if self.password.is_some() {
            write!(f, " password=*****")?;
        }
        Ok(())
    }
}

/// A resolved repository: the parsed symbolic URL plus the provider's descriptor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScmRepository {
    raw_url: String,
    provider_id: String,
    delimiter: char,
    provider_repository: ProviderRepository,
}

impl ScmRepository {
    /// Combine a parsed URL with the provider's descriptor
    pub fn new(url: &ScmUrl, provider_repository: ProviderRepository) -> Self {
        Self {
            raw_url: url.to_string(),
            provider_id: url.provider().to_string(),
            delimiter: url.delimiter(),
            provider_repository,
        }
    }

    /// The URL as given by the caller
    pub fn raw_url(&self) -> &str {
        &self.raw_url
    }

    /// Provider id
    pub fn provider_id(&self) -> &str {
        &self.provider_id
    }

    /// Delimiter used in the URL
    pub fn delimiter(&self) -> char {
        self.delimiter
    }

    /// Provider-specific descriptor
    pub fn provider_repository(&self) -> &ProviderRepository {
        &self.provider_repository
    }
}

impl fmt::Display for ScmRepository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.provider_id, self.provider_repository)
    }
}
