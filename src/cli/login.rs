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
use std::io::{self, Read, Write};

use log::{error, warn};

use super::main::LoginSubcommand;
use crate::hook;
use crate::mailcow::Client;
use crate::session::JsonSession;
use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

pub(super) fn login(system_config: SystemConfig, cmd: LoginSubcommand) {
    let input = match cmd.session {
        Some(ref path) => fs::read_to_string(path).map_err(|e| {
            (format!("Failed to read session from '{}'", path.display()), e)
        }),
        None => {
            let mut input = String::new();
            io::stdin()
                .read_to_string(&mut input)
                .map(|_| input)
                .map_err(|e| {
                    ("Failed to read session from stdin".to_owned(), e)
                })
        }
    };

    let input = match input {
        Ok(input) => input,
        Err((what, e)) => die!(EX_NOINPUT, "{}: {}", what, e),
    };

    let output = match JsonSession::parse(&input) {
        Ok(mut session) => {
            match Client::new(&system_config.mailcow) {
                Ok(client) => hook::on_login(
                    &system_config,
                    &client,
                    &mut session,
                    &cmd.username,
                ),
                Err(e) => error!("Failed to set up mailcow client: {}", e),
            }
            session.to_json()
        }
        Err(e) => {
            warn!("Session is not a JSON object, passing it through: {}", e);
            input.trim_end().to_owned()
        }
    };

    let mut stdout = io::stdout();
    if let Err(e) = stdout
        .write_all(output.as_bytes())
        .and_then(|_| stdout.write_all(b"\n"))
        .and_then(|_| stdout.flush())
    {
        die!(EX_IOERR, "Failed to write session: {}", e);
    }
}
