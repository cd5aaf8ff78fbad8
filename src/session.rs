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

//! The archive's session state, as far as login-time address lookup is
//! concerned.

use std::collections::BTreeSet;

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

use crate::resolve::ResolutionResult;

pub const AUTH_DATA: &str = "auth_data";
pub const WILDCARD_DOMAINS: &str = "wildcard_domains";

/// What the archive knows about the logged-in user.
///
/// Fields other than `emails` and `realname` belong to the archive and are
/// carried through untouched.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthData {
    /// Addresses whose archived mail the user may see.
    #[serde(default, deserialize_with = "deserialize_emails")]
    pub emails: Vec<String>,
    #[serde(
        default,
        deserialize_with = "deserialize_realname",
        skip_serializing_if = "Option::is_none"
    )]
    pub realname: Option<String>,
    #[serde(flatten)]
    pub other: Map<String, Value>,
}

impl AuthData {
    /// Add `addresses` to `emails`, skipping any already present (ignoring
    /// case). Existing entries keep their order.
    pub fn merge_emails<'a>(
        &mut self,
        addresses: impl IntoIterator<Item = &'a String>,
    ) {
        let mut known = self
            .emails
            .iter()
            .map(|e| e.to_lowercase())
            .collect::<BTreeSet<_>>();
        for address in addresses {
            if known.insert(address.to_lowercase()) {
                self.emails.push(address.clone());
            }
        }
    }
}

// The archive is loose about these two fields: `emails` may be null or, once
// PHP has removed duplicates from it, an object keyed by index.
fn deserialize_emails<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Vec<String>, D::Error> {
    let elements = match Value::deserialize(de)? {
        Value::Null => return Ok(Vec::new()),
        Value::String(email) => return Ok(vec![email]),
        Value::Array(elements) => elements,
        Value::Object(elements) => {
            elements.into_iter().map(|(_, v)| v).collect()
        }
        other => {
            warn!("Ignoring auth_data.emails of unexpected type: {}", other);
            return Ok(Vec::new());
        }
    };

    let mut emails = Vec::with_capacity(elements.len());
    for element in elements {
        match element {
            Value::String(email) => emails.push(email),
            other => warn!("Ignoring non-string auth_data.emails: {}", other),
        }
    }

    Ok(emails)
}

fn deserialize_realname<'de, D: Deserializer<'de>>(
    de: D,
) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(de)? {
        Value::Null => None,
        Value::String(realname) => Some(realname),
        Value::Number(n) => Some(n.to_string()),
        other => {
            warn!("Ignoring auth_data.realname of unexpected type: {}", other);
            None
        }
    })
}

/// Read/write access to the session owned by the archive.
pub trait SessionStore {
    /// Return the current auth data, or `None` if there is none or it is an
    /// empty object.
    ///
    /// Fails if the auth data is present but is not an object.
    fn auth_data(&self) -> Result<Option<AuthData>, serde_json::Error>;
    fn set_auth_data(&mut self, auth_data: AuthData);
    fn set_wildcard_domains(&mut self, domains: &BTreeSet<String>);
}

/// A session held as a JSON object, which is how the archive hands its
/// session to the login hook and takes it back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct JsonSession {
    root: Map<String, Value>,
}

impl JsonSession {
    /// Parse a session document. Blank input is an empty session.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        Ok(Self {
            root: serde_json::from_str(text)?,
        })
    }

    pub fn to_json(&self) -> String {
        Value::Object(self.root.clone()).to_string()
    }
}

impl SessionStore for JsonSession {
    fn auth_data(&self) -> Result<Option<AuthData>, serde_json::Error> {
        match self.root.get(AUTH_DATA) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Object(o)) if o.is_empty() => Ok(None),
            Some(v) => serde_json::from_value(v.clone()).map(Some),
        }
    }

    fn set_auth_data(&mut self, auth_data: AuthData) {
        // Serialising a struct with string keys into a Value cannot fail
        if let Ok(value) = serde_json::to_value(auth_data) {
            self.root.insert(AUTH_DATA.to_owned(), value);
        }
    }

    fn set_wildcard_domains(&mut self, domains: &BTreeSet<String>) {
        self.root.insert(
            WILDCARD_DOMAINS.to_owned(),
            Value::Array(domains.iter().cloned().map(Value::String).collect()),
        );
    }
}

/// Write the outcome of a login's alias resolution into `session`.
///
/// Resolved addresses are merged into `auth_data.emails`, `realname` replaces
/// any existing real name, and the wildcard domains are always written, even
/// when there are none.
pub fn project(
    session: &mut impl SessionStore,
    mut auth_data: AuthData,
    result: &ResolutionResult,
    realname: Option<String>,
) {
    auth_data.merge_emails(&result.resolved_addresses);
    if realname.is_some() {
        auth_data.realname = realname;
    }

    session.set_auth_data(auth_data);
    session.set_wildcard_domains(&result.matched_wildcard_domains);
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    fn strings(ss: &[&str]) -> BTreeSet<String> {
        ss.iter().map(|&s| s.to_owned()).collect()
    }

    #[test]
    fn parse_sessions() {
        assert_eq!(JsonSession::default(), JsonSession::parse("").unwrap());
        assert_eq!(JsonSession::default(), JsonSession::parse(" \n").unwrap());
        assert!(JsonSession::parse("[]").is_err());
        assert!(JsonSession::parse("{").is_err());

        let session = JsonSession::parse(
            r#"{"auth_data":{"username":"m@x.com","emails":["m@x.com"]}}"#,
        )
        .unwrap();
        let auth_data = session.auth_data().unwrap().unwrap();
        assert_eq!(vec!["m@x.com"], auth_data.emails);
        assert_eq!(None, auth_data.realname);
        assert_eq!(Some(&json!("m@x.com")), auth_data.other.get("username"));
    }

    #[test]
    fn missing_or_empty_auth_data() {
        assert_eq!(
            None,
            JsonSession::parse("{}").unwrap().auth_data().unwrap()
        );
        assert_eq!(
            None,
            JsonSession::parse(r#"{"auth_data":null}"#)
                .unwrap()
                .auth_data()
                .unwrap()
        );
        assert!(JsonSession::parse(r#"{"auth_data":"bogus"}"#)
            .unwrap()
            .auth_data()
            .is_err());
        assert!(JsonSession::parse(r#"{"auth_data":[]}"#)
            .unwrap()
            .auth_data()
            .is_err());
        assert_eq!(
            None,
            JsonSession::parse(r#"{"auth_data":{}}"#)
                .unwrap()
                .auth_data()
                .unwrap()
        );
    }

    fn auth_data_of(text: &str) -> AuthData {
        JsonSession::parse(text).unwrap().auth_data().unwrap().unwrap()
    }

    #[test]
    fn loosely_typed_auth_data() {
        crate::init_test_log();

        let auth_data = auth_data_of(r#"{"auth_data":{"emails":null}}"#);
        assert!(auth_data.emails.is_empty());

        assert_eq!(
            vec!["m@x.com", "a@x.com"],
            auth_data_of(
                r#"{"auth_data":{"emails":{"0":"m@x.com","2":"a@x.com"}}}"#
            )
            .emails
        );
        assert_eq!(
            vec!["m@x.com"],
            auth_data_of(r#"{"auth_data":{"emails":"m@x.com"}}"#).emails
        );
        assert_eq!(
            vec!["m@x.com"],
            auth_data_of(r#"{"auth_data":{"emails":["m@x.com",7,null]}}"#)
                .emails
        );
        assert!(auth_data_of(r#"{"auth_data":{"emails":true}}"#)
            .emails
            .is_empty());

        let auth_data = auth_data_of(
            r#"{"auth_data":{"emails":["m@x.com"],"realname":42}}"#,
        );
        assert_eq!(Some("42".to_owned()), auth_data.realname);
        let auth_data = auth_data_of(
            r#"{"auth_data":{"emails":["m@x.com"],"realname":{"x":1}}}"#,
        );
        assert_eq!(None, auth_data.realname);
    }

    #[test]
    fn merge_emails_is_a_union() {
        let mut auth_data = AuthData {
            emails: vec!["m@x.com".to_owned(), "Info@x.com".to_owned()],
            ..AuthData::default()
        };
        auth_data
            .merge_emails(&strings(&["a@x.com", "info@x.com", "m@x.com"]));
        assert_eq!(
            vec!["m@x.com", "Info@x.com", "a@x.com"],
            auth_data.emails
        );
    }

    #[test]
    fn project_into_session() {
        let mut session = JsonSession::parse(
            r#"{
                "auth_data": {
                    "username": "m@x.com",
                    "emails": ["m@x.com"],
                    "realname": "m"
                },
                "csrf": "abc"
            }"#,
        )
        .unwrap();
        let auth_data = session.auth_data().unwrap().unwrap();

        project(
            &mut session,
            auth_data,
            &ResolutionResult {
                resolved_addresses: strings(&["a@x.com", "b@x.com"]),
                matched_wildcard_domains: strings(&["x.com"]),
            },
            Some("Mia Mailbox".to_owned()),
        );

        assert_eq!(
            json!({
                "auth_data": {
                    "username": "m@x.com",
                    "emails": ["m@x.com", "a@x.com", "b@x.com"],
                    "realname": "Mia Mailbox"
                },
                "csrf": "abc",
                "wildcard_domains": ["x.com"]
            }),
            serde_json::from_str::<Value>(&session.to_json()).unwrap()
        );
    }

    #[test]
    fn project_without_results() {
        let mut session = JsonSession::parse(
            r#"{"auth_data":{"emails":["m@x.com"],"realname":"Mia"}}"#,
        )
        .unwrap();
        let auth_data = session.auth_data().unwrap().unwrap();

        project(&mut session, auth_data, &ResolutionResult::default(), None);

        assert_eq!(
            json!({
                "auth_data": {"emails": ["m@x.com"], "realname": "Mia"},
                "wildcard_domains": []
            }),
            serde_json::from_str::<Value>(&session.to_json()).unwrap()
        );
    }
}
