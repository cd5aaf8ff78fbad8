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

//! The login hook: everything that happens when a user logs in to the
//! archive.

use log::{debug, info, warn};

use crate::mailcow::model::normalise_address;
use crate::mailcow::MailcowApi;
use crate::resolve;
use crate::session::{self, SessionStore};
use crate::support::log_prefix::LogPrefix;
use crate::support::system_config::SystemConfig;

/// Grant `username` access to the archived mail of every address that
/// delivers to their mailbox.
///
/// Does nothing (and makes no API calls) if `username` is empty or the
/// session carries no auth data, as is the case for accounts the archive
/// manages itself. Failures to reach the API degrade to granting nothing
/// extra; this never fails.
pub fn on_login(
    config: &SystemConfig,
    api: &impl MailcowApi,
    session: &mut impl SessionStore,
    username: &str,
) {
    let mut log_prefix = LogPrefix::new("login");
    let mailbox = normalise_address(username);
    if mailbox.is_empty() {
        debug!("{} No user name, skipping alias lookup", log_prefix);
        return;
    }
    log_prefix.set_user(&mailbox);

    let auth_data = match session.auth_data() {
        Ok(Some(auth_data)) => auth_data,
        Ok(None) => {
            debug!("{} No auth data in session, skipping", log_prefix);
            return;
        }
        Err(e) => {
            warn!(
                "{} Unusable auth data in session, skipping: {}",
                log_prefix, e
            );
            return;
        }
    };

    let aliases = api.fetch_active_aliases();
    let result = resolve::resolve(&mailbox, &aliases);

    let realname = if config.mailcow.set_realname {
        api.fetch_realname(&mailbox)
    } else {
        None
    };

    info!(
        "{} {} aliases, {} wildcard domains{}",
        log_prefix,
        result.resolved_addresses.len(),
        result.matched_wildcard_domains.len(),
        if realname.is_some() {
            ", real name set"
        } else {
            ""
        },
    );

    session::project(session, auth_data, &result, realname);
}
