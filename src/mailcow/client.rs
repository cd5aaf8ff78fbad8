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

use log::{debug, warn};
use reqwest::blocking;
use reqwest::Url;

use super::model::{parse_alias_list, parse_realname, AliasRecord};
use crate::support::error::Error;
use crate::support::system_config::MailcowConfig;

/// The read-only view of the mailcow API used at login time.
///
/// Implementations never fail: anything that goes wrong is logged and
/// reported as "no data", so that a broken API only costs the user their
/// extra archive access rather than their login.
pub trait MailcowApi {
    /// Return every active alias known to the server.
    fn fetch_active_aliases(&self) -> Vec<AliasRecord>;

    /// Return the display name of `mailbox`, if it has one.
    fn fetch_realname(&self, mailbox: &str) -> Option<String>;
}

/// Blocking HTTP client for the mailcow `/api/v1` endpoints.
pub struct Client {
    http: blocking::Client,
    base: Url,
    api_key: String,
}

impl Client {
    pub fn new(config: &MailcowConfig) -> Result<Self, Error> {
        let base = config.api_url()?;

        let http = blocking::Client::builder()
            .timeout(config.timeout())
            .danger_accept_invalid_certs(config.allow_insecure_tls)
            .build()?;

        Ok(Self {
            http,
            base,
            api_key: config.api_key.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base.clone();
        // Checked in new()
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    fn get(&self, segments: &[&str]) -> Result<Vec<u8>, Error> {
        let url = self.endpoint(segments);
        debug!("GET {}", url);

        let response = self
            .http
            .get(url)
            .header("X-API-Key", &self.api_key)
            .header(reqwest::header::ACCEPT, "application/json")
            .send()?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status(status));
        }

        Ok(response.bytes()?.to_vec())
    }

    /// Fetch the full alias table, including inactive aliases.
    pub fn fetch_all_aliases(&self) -> Result<Vec<AliasRecord>, Error> {
        parse_alias_list(&self.get(&["api", "v1", "get", "alias", "all"])?)
    }

    fn fetch_realname_impl(&self, mailbox: &str) -> Result<String, Error> {
        parse_realname(&self.get(&["api", "v1", "get", "mailbox", mailbox])?)
    }
}

impl MailcowApi for Client {
    fn fetch_active_aliases(&self) -> Vec<AliasRecord> {
        match self.fetch_all_aliases() {
            Ok(mut aliases) => {
                aliases.retain(|a| a.active);
                debug!("Fetched {} active aliases", aliases.len());
                aliases
            }
            Err(e) => {
                warn!("Failed to fetch aliases from {}: {}", self.base, e);
                Vec::new()
            }
        }
    }

    fn fetch_realname(&self, mailbox: &str) -> Option<String> {
        match self.fetch_realname_impl(mailbox) {
            Ok(name) => Some(name),
            Err(Error::MissingField(_)) => {
                debug!("Mailbox {} has no display name", mailbox);
                None
            }
            Err(e) => {
                warn!(
                    "Failed to fetch mailbox {} from {}: {}",
                    mailbox, self.base, e,
                );
                None
            }
        }
    }
}
