use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};

pub const TOKEN_ENV: &str = "DNSIMPLE_AUTH_TOKEN";

#[derive(Debug, Default, Serialize, Deserialize)]
struct CredentialsFile {
    #[serde(default)]
    dnsimple: Option<DnsimpleCredentials>,
}

#[derive(Debug, Serialize, Deserialize)]
struct DnsimpleCredentials {
    token: String,
}

/// DNSimple OAuth token kept in a TOML file next to the config.
#[derive(Debug, Clone)]
pub struct TokenStore {
    path: PathBuf,
}

impl TokenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Store living in `config_dir`.
    pub fn in_dir(config_dir: &Path) -> Self {
        Self::new(config_dir.join("credentials.toml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<CredentialsFile> {
        if !self.path.exists() {
            return Ok(CredentialsFile::default());
        }

        let content = fs::read_to_string(&self.path)
            .with_context(|| format!("Failed to read credentials file: {}", self.path.display()))?;

        toml::from_str(&content)
            .with_context(|| format!("Failed to parse credentials file: {}", self.path.display()))
    }

    fn save(&self, creds: &CredentialsFile) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
        }

        let content = toml::to_string_pretty(creds).context("Failed to serialize credentials")?;

        fs::write(&self.path, &content)
            .with_context(|| format!("Failed to write credentials file: {}", self.path.display()))?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = fs::Permissions::from_mode(0o600);
            fs::set_permissions(&self.path, perms)
                .with_context(|| format!("Failed to set permissions on: {}", self.path.display()))?;
        }

        Ok(())
    }

    pub fn store(&self, token: &str) -> Result<()> {
        let token = token.trim();
        if token.is_empty() {
            return Err(anyhow!("Refusing to store an empty token"));
        }

        let mut creds = self.load()?;
        creds.dnsimple = Some(DnsimpleCredentials {
            token: token.to_string(),
        });
        self.save(&creds)
    }

    /// The stored token, if any.
    pub fn get(&self) -> Result<Option<String>> {
        Ok(self.load()?.dnsimple.map(|c| c.token))
    }

    pub fn delete(&self) -> Result<()> {
        let mut creds = self.load()?;

        if creds.dnsimple.take().is_none() {
            return Err(anyhow!("No DNSimple token stored in {}", self.path.display()));
        }

        self.save(&creds)
    }

    /// Explicit token (flag or environment) first, then the stored one.
    pub fn resolve(&self, explicit: Option<&str>) -> Result<String> {
        if let Some(token) = explicit.map(str::trim).filter(|t| !t.is_empty()) {
            return Ok(token.to_string());
        }

        self.get()?.ok_or_else(|| {
            anyhow!(
                "No DNSimple token found. Pass --token, set {}, or run 'dnsimple-ddns set-token'.",
                TOKEN_ENV
            )
        })
    }
}
