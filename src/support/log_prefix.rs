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

use std::fmt;

/// Text included at the start of every log statement about one login.
#[derive(Clone, Debug)]
pub struct LogPrefix {
    operation: String,
    user: Option<String>,
}

impl LogPrefix {
    pub fn new(operation: &str) -> Self {
        Self {
            operation: operation.to_owned(),
            user: None,
        }
    }

    pub fn set_user(&mut self, user: &str) {
        self.user = Some(sanitise(user.to_owned()));
    }
}

impl fmt::Display for LogPrefix {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.operation)?;
        if let Some(ref user) = self.user {
            write!(f, "[{user}]")?;
        }

        Ok(())
    }
}

// The user name comes straight from the archive's login form, so keep it from
// forging log lines or flooding the log.
fn sanitise(mut s: String) -> String {
    s.retain(|c| !c.is_control());
    if let Some((truncate_len, _)) = s.char_indices().nth(64) {
        s.truncate(truncate_len);
    }

    s
}
