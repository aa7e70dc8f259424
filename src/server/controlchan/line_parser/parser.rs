use super::error::{ParseErrorKind, Result};
use crate::server::controlchan::command::Command;
use crate::server::controlchan::commands::{ModeParam, Opt, StruParam, TypeParam};
use crate::server::password::Password;

use std::net::Ipv4Addr;
use std::str;

/// Parse the given bytes into a [`Command`].
///
/// [`Command`]: crate::server::controlchan::command::Command
pub fn parse<T>(line: T) -> Result<Command>
where
    T: AsRef<[u8]>,
{
    let line = str::from_utf8(line.as_ref())?;
    let line = strip_eol(line)?;
    let (verb, params) = match line.find(' ') {
        Some(pos) => (&line[..pos], &line[pos + 1..]),
        None => (line, ""),
    };
    let verb = verb.to_uppercase();

    let cmd = match verb.as_str() {
        "USER" => Command::User {
            username: required(params)?.to_string(),
        },
        "PASS" => Command::Pass {
            // Empty passwords are a thing for anonymous logins.
            password: Password::new(params),
        },
        "ACCT" => Command::Acct {
            account: required(params)?.to_string(),
        },
        "SYST" => {
            no_params(params)?;
            Command::Syst
        }
        "STAT" => Command::Stat { path: optional(params) },
        "TYPE" => Command::Type { type_: parse_type(params)? },
        "STRU" => {
            let structure = match required(params)? {
                "F" => StruParam::File,
                "R" => StruParam::Record,
                "P" => StruParam::Page,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            };
            Command::Stru { structure }
        }
        "MODE" => {
            let mode = match required(params)? {
                "S" => ModeParam::Stream,
                "B" => ModeParam::Block,
                "C" => ModeParam::Compressed,
                _ => return Err(ParseErrorKind::InvalidCommand.into()),
            };
            Command::Mode { mode }
        }
        "HELP" => Command::Help,
        "NOOP" => {
            // RFC 959 gives NOOP no argument.
            no_params(params)?;
            Command::Noop
        }
        "PASV" => {
            no_params(params)?;
            Command::Pasv
        }
        "PORT" => {
            let (host, port) = parse_port(required(params)?)?;
            Command::Port { host, port }
        }
        "RETR" => Command::Retr {
            path: required(params)?.to_string(),
        },
        "STOR" => Command::Stor {
            path: required(params)?.to_string(),
        },
        "STOU" => {
            no_params(params)?;
            Command::Stou
        }
        "APPE" => Command::Appe {
            path: required(params)?.to_string(),
        },
        "ALLO" => {
            let size = match params.split(' ').next().filter(|s| !s.is_empty()) {
                Some(token) => Some(token.parse::<u64>().map_err(|_| ParseErrorKind::InvalidCommand)?),
                None => None,
            };
            Command::Allo { size }
        }
        "REST" => {
            let offset = required(params)?.parse::<u64>().map_err(|_| ParseErrorKind::InvalidCommand)?;
            Command::Rest { offset }
        }
        "RNFR" => Command::Rnfr {
            file: required(params)?.into(),
        },
        "RNTO" => Command::Rnto {
            file: required(params)?.into(),
        },
        "ABOR" => {
            no_params(params)?;
            Command::Abor
        }
        "DELE" => Command::Dele {
            path: required(params)?.to_string(),
        },
        "RMD" => Command::Rmd {
            path: required(params)?.to_string(),
        },
        "MKD" | "XMKD" => Command::Mkd {
            path: required(params)?.into(),
        },
        "PWD" | "XPWD" => {
            no_params(params)?;
            Command::Pwd
        }
        "CWD" | "XCWD" => Command::Cwd {
            path: required(params)?.into(),
        },
        "CDUP" => {
            no_params(params)?;
            Command::Cdup
        }
        "LIST" => {
            let mut options: Vec<&str> = Vec::new();
            let mut path = None;
            for token in params.split(' ').filter(|s| !s.is_empty()) {
                if token.starts_with('-') {
                    options.push(token);
                } else if path.is_none() {
                    path = Some(token.to_string());
                }
            }
            Command::List {
                options: if options.is_empty() { None } else { Some(options.join(" ")) },
                path,
            }
        }
        "NLST" => Command::Nlst { path: optional(params) },
        "SITE" => Command::Site {
            param: required(params)?.to_string(),
        },
        "QUIT" => {
            no_params(params)?;
            Command::Quit
        }
        "REIN" => {
            no_params(params)?;
            Command::Rein
        }
        "FEAT" => {
            no_params(params)?;
            Command::Feat
        }
        "OPTS" => match required(params)?.to_uppercase().as_str() {
            "UTF8 ON" => Command::Opts { option: Opt::Utf8 { on: true } },
            "UTF8 OFF" => Command::Opts { option: Opt::Utf8 { on: false } },
            _ => return Err(ParseErrorKind::InvalidCommand.into()),
        },
        _ => Command::Other {
            command_name: verb,
            arguments: params.to_string(),
        },
    };

    Ok(cmd)
}

// Commands must end in '\n'; the '\r' before it is what the RFC asks for
// but not every client sends it. A carriage return anywhere else is noise.
fn strip_eol(line: &str) -> Result<&str> {
    let stripped = line
        .strip_suffix("\r\n")
        .or_else(|| line.strip_suffix('\n'))
        .ok_or(ParseErrorKind::InvalidEol)?;
    if stripped.contains('\r') || stripped.contains('\n') {
        return Err(ParseErrorKind::InvalidEol.into());
    }
    Ok(stripped)
}

fn required(params: &str) -> Result<&str> {
    if params.is_empty() {
        Err(ParseErrorKind::InvalidCommand.into())
    } else {
        Ok(params)
    }
}

fn no_params(params: &str) -> Result<()> {
    if params.is_empty() {
        Ok(())
    } else {
        Err(ParseErrorKind::InvalidCommand.into())
    }
}

fn optional(params: &str) -> Option<String> {
    if params.is_empty() {
        None
    } else {
        Some(params.to_string())
    }
}

fn parse_type(params: &str) -> Result<TypeParam> {
    let mut tokens = params.split(' ').filter(|s| !s.is_empty());
    let type_ = match (tokens.next(), tokens.next(), tokens.next()) {
        (Some("A"), None, None) | (Some("A"), Some("N"), None) => TypeParam::Ascii,
        (Some("E"), None, None) | (Some("E"), Some("N"), None) => TypeParam::Ebcdic,
        (Some("I"), None, None) => TypeParam::Image,
        (Some("L"), Some(bits), None) => {
            let bits = bits.parse::<u8>().map_err(|_| ParseErrorKind::InvalidCommand)?;
            TypeParam::Local(bits)
        }
        _ => return Err(ParseErrorKind::InvalidCommand.into()),
    };
    Ok(type_)
}

// The PORT argument is h1,h2,h3,h4,p1,p2 with the port being p1*256+p2.
fn parse_port(params: &str) -> Result<(Ipv4Addr, u16)> {
    let mut octets = [0u8; 6];
    let mut count = 0;
    for field in params.split(',') {
        if count == 6 {
            return Err(ParseErrorKind::InvalidCommand.into());
        }
        octets[count] = field.trim().parse::<u8>().map_err(|_| ParseErrorKind::InvalidCommand)?;
        count += 1;
    }
    if count != 6 {
        return Err(ParseErrorKind::InvalidCommand.into());
    }
    let host = Ipv4Addr::new(octets[0], octets[1], octets[2], octets[3]);
    let port = u16::from(octets[4]) << 8 | u16::from(octets[5]);
    Ok((host, port))
}
