//! The parsed form of a control-channel line: one verb from the catalog,
//! bound to its arguments.

use crate::server::controlchan::commands::{ModeParam, Opt, StruParam, TypeParam};
use crate::server::controlchan::sequence::CommandCode;
use crate::server::password::Password;

use std::path::PathBuf;

#[derive(Debug, PartialEq, Clone)]
#[allow(clippy::large_enum_variant)]
pub enum Command {
    User {
        /// The bytes making up the actual username.
        username: String,
    },
    Pass {
        /// The password to login with, redacted in Debug output.
        password: Password,
    },
    Acct {
        /// The account name.
        account: String,
    },
    Syst,
    Stat {
        /// The path the client wants the status of, if any.
        path: Option<String>,
    },
    Type {
        /// The representation type (ASCII, EBCDIC, IMAGE or LOCAL n).
        type_: TypeParam,
    },
    Stru {
        /// The file structure (file, record or page).
        structure: StruParam,
    },
    Mode {
        /// The transfer mode (stream, block or compressed).
        mode: ModeParam,
    },
    Help,
    Noop,
    Pasv,
    Port {
        /// The IPv4 address the client advertised.
        host: std::net::Ipv4Addr,
        /// The port, already combined from p1*256+p2.
        port: u16,
    },
    Retr {
        /// The path to the file the client would like to retrieve.
        path: String,
    },
    Stor {
        /// The path to the file the client would like to store.
        path: String,
    },
    Stou,
    Appe {
        /// The path to the file the client would like to append to.
        path: String,
    },
    Allo {
        /// The requested allocation, which we accept and ignore.
        size: Option<u64>,
    },
    Rest {
        /// The byte offset to resume the next transfer at.
        offset: u64,
    },
    Rnfr {
        /// The file to be renamed.
        file: PathBuf,
    },
    Rnto {
        /// The new name.
        file: PathBuf,
    },
    Abor,
    Dele {
        /// The file to delete.
        path: String,
    },
    Rmd {
        /// The directory to remove.
        path: String,
    },
    Mkd {
        /// The directory to create.
        path: PathBuf,
    },
    Pwd,
    Cwd {
        /// The directory to change into.
        path: PathBuf,
    },
    Cdup,
    List {
        /// Listing options, passed through untouched.
        options: Option<String>,
        /// The path to list, default the working directory.
        path: Option<String>,
    },
    Nlst {
        /// The path to list, default the working directory.
        path: Option<String>,
    },
    Site {
        /// Whatever came after SITE.
        param: String,
    },
    Quit,
    Rein,
    Feat,
    Opts {
        /// The option the client wants to set.
        option: Opt,
    },
    Other {
        /// The verb we don't know.
        command_name: String,
        /// Its arguments, untouched.
        arguments: String,
    },
}

impl Command {
    /// The catalog tag of this command, used for sequencing.
    pub fn code(&self) -> CommandCode {
        match self {
            Command::User { .. } => CommandCode::User,
            Command::Pass { .. } => CommandCode::Pass,
            Command::Acct { .. } => CommandCode::Acct,
            Command::Syst => CommandCode::Syst,
            Command::Stat { .. } => CommandCode::Stat,
            Command::Type { .. } => CommandCode::Type,
            Command::Stru { .. } => CommandCode::Stru,
            Command::Mode { .. } => CommandCode::Mode,
            Command::Help => CommandCode::Help,
            Command::Noop => CommandCode::Noop,
            Command::Pasv => CommandCode::Pasv,
            Command::Port { .. } => CommandCode::Port,
            Command::Retr { .. } => CommandCode::Retr,
            Command::Stor { .. } => CommandCode::Stor,
            Command::Stou => CommandCode::Stou,
            Command::Appe { .. } => CommandCode::Appe,
            Command::Allo { .. } => CommandCode::Allo,
            Command::Rest { .. } => CommandCode::Rest,
            Command::Rnfr { .. } => CommandCode::Rnfr,
            Command::Rnto { .. } => CommandCode::Rnto,
            Command::Abor => CommandCode::Abor,
            Command::Dele { .. } => CommandCode::Dele,
            Command::Rmd { .. } => CommandCode::Rmd,
            Command::Mkd { .. } => CommandCode::Mkd,
            Command::Pwd => CommandCode::Pwd,
            Command::Cwd { .. } => CommandCode::Cwd,
            Command::Cdup => CommandCode::Cdup,
            Command::List { .. } => CommandCode::List,
            Command::Nlst { .. } => CommandCode::Nlst,
            Command::Site { .. } => CommandCode::Site,
            Command::Quit => CommandCode::Quit,
            Command::Rein => CommandCode::Rein,
            Command::Feat => CommandCode::Feat,
            Command::Opts { .. } => CommandCode::Opts,
            Command::Other { .. } => CommandCode::Unknown,
        }
    }
}
