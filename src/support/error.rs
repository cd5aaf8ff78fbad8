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

use std::io;

use thiserror::Error;

/// Errors encountered while talking to the mailcow API.
///
/// None of these escape the API client's public fetch methods; they exist so
/// that the reason for a soft failure can be logged.
#[derive(Error, Debug)]
pub enum Error {
    #[error("API responded with status {0}")]
    Status(reqwest::StatusCode),
    #[error("Response field '{0}' missing or empty")]
    MissingField(&'static str),
    #[error("Unexpected response: {0}")]
    UnexpectedResponse(&'static str),
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Http(#[from] reqwest::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Errors in the system configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("mailcow.api_key is not set")]
    MissingApiKey,
    #[error("Neither mailcow.api_host nor mailcow.imap_host is set")]
    MissingApiHost,
    #[error("Invalid mailcow API URL: {0}")]
    BadApiUrl(String),
    #[error("mailcow.timeout_secs must be greater than zero")]
    ZeroTimeout,
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Toml(#[from] toml::de::Error),
}
