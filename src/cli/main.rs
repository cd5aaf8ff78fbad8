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

use std::path::{Path, PathBuf};

use structopt::StructOpt;

use crate::support::sysexits::*;
use crate::support::system_config::SystemConfig;

const CONFIG_FILE: &str = "piler-mailcow.toml";

#[derive(StructOpt)]
#[structopt(max_term_width = 80)]
enum Command {
    /// Run the archive login hook for one user.
    ///
    /// The archive's current session is read as a JSON object from standard
    /// input (or `--session`). The aliases and wildcard domains delivering to
    /// the user's mailbox are merged into `auth_data.emails` and
    /// `wildcard_domains`, and the updated session is written to standard
    /// output.
    ///
    /// Problems talking to mailcow never cause this to fail; the session is
    /// simply returned without any additional addresses.
    Login(LoginSubcommand),
    /// Show which addresses and wildcard domains deliver to a mailbox.
    Resolve(ResolveSubcommand),
    /// List the aliases known to the mailcow server.
    Aliases(AliasesSubcommand),
    /// Validate the configuration and show the API endpoint it selects.
    CheckConfig(CommonOptions),
}

#[derive(StructOpt, Default)]
pub(super) struct CommonOptions {
    /// The directory containing `piler-mailcow.toml` and optionally
    /// `logging.toml`
    /// [default: /etc/piler-mailcow or /usr/local/etc/piler-mailcow]
    #[structopt(long, parse(from_os_str))]
    root: Option<PathBuf>,

    /// Use this configuration file instead of the one under the root.
    #[structopt(long, parse(from_os_str))]
    config: Option<PathBuf>,
}

#[derive(StructOpt)]
pub(super) struct LoginSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Read the session from this file instead of standard input.
    #[structopt(long, parse(from_os_str))]
    pub(super) session: Option<PathBuf>,

    /// The name the user logged in with; this is their mailbox address.
    pub(super) username: String,
}

#[derive(StructOpt)]
pub(super) struct ResolveSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Print the result as JSON.
    #[structopt(long)]
    pub(super) json: bool,

    /// The mailbox address to resolve.
    pub(super) mailbox: String,
}

#[derive(StructOpt)]
pub(super) struct AliasesSubcommand {
    #[structopt(flatten)]
    pub(super) common: CommonOptions,

    /// Also show inactive aliases.
    #[structopt(long)]
    pub(super) all: bool,
}

impl Command {
    fn common_options(&self) -> &CommonOptions {
        match *self {
            Command::Login(ref c) => &c.common,
            Command::Resolve(ref c) => &c.common,
            Command::Aliases(ref c) => &c.common,
            Command::CheckConfig(ref c) => c,
        }
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = Command::from_clap(&match Command::clap().get_matches_safe() {
        Ok(matches) => matches,
        Err(
            e @ clap::Error {
                kind: clap::ErrorKind::HelpDisplayed,
                ..
            },
        )
        | Err(
            e @ clap::Error {
                kind: clap::ErrorKind::VersionDisplayed,
                ..
            },
        ) => {
            println!("{}", e.message);
            return;
        }
        Err(e) => {
            eprintln!("{}", e.message);
            EX_USAGE.exit()
        }
    });

    let (root, config_path) = locate_config(cmd.common_options());
    init_log(&root);

    let system_config = match SystemConfig::load(&config_path) {
        Ok(config) => config,
        Err(e) => die!(
            EX_CONFIG,
            "Error in config file at '{}': {}",
            config_path.display(),
            e
        ),
    };

    match cmd {
        Command::Login(cmd) => super::login::login(system_config, cmd),
        Command::Resolve(cmd) => {
            super::inspect::resolve_mailbox(system_config, cmd)
        }
        Command::Aliases(cmd) => super::inspect::aliases(system_config, cmd),
        Command::CheckConfig(_) => super::inspect::check_config(system_config),
    }
}

fn locate_config(common: &CommonOptions) -> (PathBuf, PathBuf) {
    if let Some(ref config) = common.config {
        let root = common.root.clone().unwrap_or_else(|| {
            config
                .parent()
                .map(Path::to_owned)
                .unwrap_or_else(|| ".".to_owned().into())
        });
        return (root, config.clone());
    }

    let root = common.root.clone().unwrap_or_else(|| {
        if Path::new("/etc/piler-mailcow").join(CONFIG_FILE).is_file() {
            "/etc/piler-mailcow".to_owned().into()
        } else if Path::new("/usr/local/etc/piler-mailcow")
            .join(CONFIG_FILE)
            .is_file()
        {
            "/usr/local/etc/piler-mailcow".to_owned().into()
        } else {
            die!(
                EX_CONFIG,
                "Neither /etc/piler-mailcow nor /usr/local/etc/piler-mailcow\n\
                 contains {}; use --root=/path/to/dir or\n\
                 --config=/path/to/{} if your installation is elsewhere.",
                CONFIG_FILE,
                CONFIG_FILE
            )
        }
    });

    let config = root.join(CONFIG_FILE);
    (root, config)
}

fn init_log(root: &Path) {
    if Ok(true) == nix::unistd::isatty(2) {
        // Running interactively; ignore logging configuration and just write
        // to stderr.
        crate::init_simple_log();
        return;
    }

    // The archive runs us from its login page. If logging can't be set up,
    // carry on without it rather than refusing the login.
    let log_config_file = root.join("logging.toml");
    if log_config_file.is_file() {
        if let Err(e) = log4rs::init_file(
            &log_config_file,
            log4rs::config::Deserializers::new(),
        ) {
            eprintln!(
                "Failed to initialise logging from '{}': {}",
                log_config_file.display(),
                e
            );
        }
        return;
    }

    let formatter = syslog::Formatter3164 {
        facility: syslog::Facility::LOG_AUTH,
        hostname: None,
        process: env!("CARGO_PKG_NAME").to_owned(),
        pid: nix::unistd::getpid().as_raw(),
    };

    match syslog::unix(formatter) {
        Ok(logger) => {
            if let Err(e) = log::set_boxed_logger(Box::new(
                syslog::BasicLogger::new(logger),
            ))
            .map(|_| log::set_max_level(log::LevelFilter::Info))
            {
                eprintln!("Failed to initialise logging: {}", e);
            }
        }
        Err(e) => eprintln!("Failed to connect to syslog: {}", e),
    }
}
