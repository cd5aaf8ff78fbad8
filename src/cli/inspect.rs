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

//! Subcommands for operators checking what a login would see.

use super::main::{AliasesSubcommand, ResolveSubcommand};
use crate::mailcow::model::normalise_address;
use crate::mailcow::{Client, MailcowApi};
use crate::resolve;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

fn client(system_config: &SystemConfig) -> Client {
    match Client::new(&system_config.mailcow) {
        Ok(client) => client,
        Err(e) => {
            die!(EX_CONFIG, "Failed to set up mailcow client: {}", e)
        }
    }
}

pub(super) fn resolve_mailbox(
    system_config: SystemConfig,
    cmd: ResolveSubcommand,
) {
    let client = client(&system_config);
    let mailbox = normalise_address(&cmd.mailbox);
    let aliases = client.fetch_active_aliases();
    let result = resolve::resolve(&mailbox, &aliases);

    if cmd.json {
        match serde_json::to_string_pretty(&result) {
            Ok(json) => println!("{}", json),
            Err(e) => die!(EX_SOFTWARE, "Failed to format result: {}", e),
        }
        return;
    }

    println!("Addresses delivering to {}:", mailbox);
    for address in &result.resolved_addresses {
        println!("  {}", address);
    }
    println!("Wildcard domains delivering to {}:", mailbox);
    for domain in &result.matched_wildcard_domains {
        println!("  @{}", domain);
    }
}

pub(super) fn aliases(system_config: SystemConfig, cmd: AliasesSubcommand) {
    let client = client(&system_config);
    let aliases = match client.fetch_all_aliases() {
        Ok(aliases) => aliases,
        Err(e) => die!(
            EX_UNAVAILABLE,
            "Failed to fetch aliases from {}: {}",
            client.base_url(),
            e
        ),
    };

    for alias in aliases.iter().filter(|a| cmd.all || a.active) {
        println!(
            "{}{} -> {}",
            alias.address,
            if alias.active { "" } else { " (inactive)" },
            alias
                .destinations
                .iter()
                .map(String::as_str)
                .collect::<Vec<_>>()
                .join(", ")
        );
    }
}

pub(super) fn check_config(system_config: SystemConfig) {
    let client = client(&system_config);
    println!("API endpoint: {}", client.base_url());
    println!(
        "Real names: {}",
        if system_config.mailcow.set_realname {
            "copied into session"
        } else {
            "not copied"
        }
    );
    println!("Timeout: {}s", system_config.mailcow.timeout_secs);
    if system_config.mailcow.allow_insecure_tls {
        println!("WARNING: TLS certificates are not verified");
    }
}
