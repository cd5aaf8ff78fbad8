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

//! A minimal stand-in for the mailcow API, serving canned responses over
//! loopback HTTP.

use std::io::{BufRead, BufReader, Write};
use std::net::{TcpListener, TcpStream};
use std::thread;

use crate::support::system_config::MailcowConfig;

/// A captured request to the fake API.
#[derive(Debug)]
pub struct Request {
    pub path: String,
    pub api_key: Option<String>,
}

/// Serve `responses` in order, one per connection, on a loopback port.
///
/// Returns the base URL and a handle yielding the captured requests once
/// all responses have been served.
pub fn fake_api(
    responses: Vec<(u16, &'static str)>,
) -> (String, thread::JoinHandle<Vec<Request>>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let base = format!("http://{}", listener.local_addr().unwrap());

    let handle = thread::spawn(move || {
        let mut requests = Vec::new();
        for (status, body) in responses {
            let (stream, _) = listener.accept().unwrap();
            requests.push(serve_one(stream, status, body));
        }
        requests
    });

    (base, handle)
}

fn serve_one(stream: TcpStream, status: u16, body: &str) -> Request {
    let mut reader = BufReader::new(stream.try_clone().unwrap());
    let mut request_line = String::new();
    reader.read_line(&mut request_line).unwrap();
    let path = request_line
        .split(' ')
        .nth(1)
        .unwrap_or_default()
        .to_owned();

    let mut api_key = None;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        let line = line.trim_end();
        if line.is_empty() {
            break;
        }

        if let Some((name, value)) = line.split_once(':') {
            if name.eq_ignore_ascii_case("x-api-key") {
                api_key = Some(value.trim().to_owned());
            }
        }
    }

    let mut stream = stream;
    write!(
        stream,
        "HTTP/1.1 {} Whatever\r\n\
         Content-Type: application/json\r\n\
         Content-Length: {}\r\n\
         Connection: close\r\n\
         \r\n\
         {}",
        status,
        body.len(),
        body
    )
    .unwrap();
    stream.flush().unwrap();

    Request { path, api_key }
}

pub fn config_for(base: &str) -> MailcowConfig {
    MailcowConfig {
        api_key: "sekrit".to_owned(),
        api_host: base.to_owned(),
        timeout_secs: 5,
        ..MailcowConfig::default()
    }
}
