//-
// Copyright (c) 2024, Jason Lingle
//
// This file is part of piler-mailcow.
//
// piler-mailcow is free software: you can redistribute it and/or modify it
// under the terms of the GNU General Public License as published by the Free
// Software Foundation, either version 3 of the License, or (at your option)
// any later version.
//
// piler-mailcow is distributed in the hope that it will be useful, but
// WITHOUT ANY WARRANTY; without even the implied warranty of MERCHANTABILITY
// or FITNESS FOR A PARTICULAR PURPOSE. See the GNU General Public License for
// more details.
//
// You should have received a copy of the GNU General Public License along
// with piler-mailcow. If not, see <http://www.gnu.org/licenses/>.

use std::fs;
use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use super::error::ConfigError;

/// The system-wide configuration for piler-mailcow.
///
/// This is stored in a file named `piler-mailcow.toml` under the system root,
/// which is typically `/usr/local/etc/piler-mailcow` or `/etc/piler-mailcow`.
#[derive(Clone, Debug, Deserialize, Serialize, Default)]
pub struct SystemConfig {
    /// How to reach the mailcow administrative API.
    pub mailcow: MailcowConfig,
}

#[derive(Clone, Debug, Deserialize, Serialize)]
#[serde(default)]
pub struct MailcowConfig {
    /// The API key sent in the `X-API-Key` header. Read-only keys suffice.
    pub api_key: String,

    /// The host running the mailcow API.
    ///
    /// This may be a bare host name (`mail.example.com`), in which case HTTPS
    /// is used, or a full base URL such as `http://127.0.0.1:8080`.
    ///
    /// If empty, `imap_host` is used instead, since the archive is usually
    /// already configured to authenticate against the mailcow IMAP server.
    pub api_host: String,

    /// The IMAP host the archive authenticates against.
    pub imap_host: String,

    /// If true, the mailbox's display name is copied into the session.
    pub set_realname: bool,

    /// Timeout for each API request, in seconds.
    pub timeout_secs: u64,

    /// Accept invalid TLS certificates from the API.
    ///
    /// Only useful when the API is reached through an internal address that
    /// does not match the certificate.
    pub allow_insecure_tls: bool,
}

impl Default for MailcowConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            api_host: String::new(),
            imap_host: String::new(),
            set_realname: false,
            timeout_secs: 5,
            allow_insecure_tls: false,
        }
    }
}

impl SystemConfig {
    /// Read and validate the configuration at `path`.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path)?;
        Self::parse(&text)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(text)?;
        config.mailcow.validate()?;
        Ok(config)
    }
}

impl MailcowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }

        self.api_url()?;

        if 0 == self.timeout_secs {
            return Err(ConfigError::ZeroTimeout);
        }

        Ok(())
    }

    fn effective_host(&self) -> Option<&str> {
        Some(self.api_host.trim())
            .filter(|h| !h.is_empty())
            .or_else(|| Some(self.imap_host.trim()).filter(|h| !h.is_empty()))
    }

    /// The base URL of the API, without a trailing slash.
    pub fn base_url(&self) -> Option<String> {
        let host = self.effective_host()?.trim_end_matches('/');
        if host.contains("://") {
            Some(host.to_owned())
        } else {
            Some(format!("https://{}", host))
        }
    }

    /// The base URL of the API, parsed and checked to be usable as a base.
    pub fn api_url(&self) -> Result<Url, ConfigError> {
        let base = self.base_url().ok_or(ConfigError::MissingApiHost)?;
        match Url::parse(&base) {
            Ok(url) if !url.cannot_be_a_base() => Ok(url),
            Ok(_) => Err(ConfigError::BadApiUrl(base)),
            Err(e) => Err(ConfigError::BadApiUrl(format!("{}: {}", base, e))),
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}
