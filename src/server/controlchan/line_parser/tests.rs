use super::error::{ParseError, ParseErrorKind};
use super::parser::parse;
use crate::server::controlchan::command::Command;
use crate::server::controlchan::commands::{ModeParam, Opt, StruParam, TypeParam};

use pretty_assertions::assert_eq;

#[test]
fn parse_user_with_crlf() {
    let input = "USER ferris\r\n";
    assert_eq!(parse(input).unwrap(), Command::User { username: "ferris".into() });
}

#[test]
// The verb is case-folded, the argument is not.
fn parse_user_verb_case_folds() {
    assert_eq!(parse("uSEr ferris\r\n").unwrap(), Command::User { username: "ferris".into() });
    assert_eq!(parse("user Ferris\r\n").unwrap(), Command::User { username: "Ferris".into() });
}

#[test]
// Plenty of clients send a bare LF; tolerate it.
fn parse_user_with_bare_lf() {
    let input = "USER ferris\n";
    assert_eq!(parse(input).unwrap(), Command::User { username: "ferris".into() });
}

#[test]
// A bare CR is not a line ending.
fn parse_user_with_bare_cr_is_rejected() {
    let input = "USER ferris\r";
    assert_eq!(parse(input), Err(ParseError::from(ParseErrorKind::InvalidEol)));
}

#[test]
fn parse_user_without_eol_is_rejected() {
    let input = "USER ferris";
    assert_eq!(parse(input), Err(ParseError::from(ParseErrorKind::InvalidEol)));
}

#[test]
// Only the separator space is eaten; a name may start with a space.
fn parse_user_keeps_extra_leading_space() {
    let input = "USER  ferris\r\n";
    assert_eq!(parse(input).unwrap(), Command::User { username: " ferris".into() });
}

#[test]
fn parse_user_name_may_contain_spaces() {
    let input = "USER crab operator\r\n";
    assert_eq!(
        parse(input).unwrap(),
        Command::User {
            username: "crab operator".into()
        }
    );
}

#[test]
fn parse_pass_with_crlf() {
    let input = "PASS hunter2\r\n";
    assert_eq!(parse(input).unwrap(), Command::Pass { password: "hunter2".into() });
}

#[test]
fn parse_pass_keeps_spaces_and_symbols() {
    let input = "PASS open sesame!#42\r\n";
    assert_eq!(
        parse(input).unwrap(),
        Command::Pass {
            password: "open sesame!#42".into()
        }
    );
}

#[test]
fn parse_acct() {
    let input = "ACCT billing-7\r\n";
    assert_eq!(parse(input).unwrap(), Command::Acct { account: "billing-7".into() });
}

#[test]
fn parse_acct_requires_an_argument() {
    assert_eq!(parse("ACCT\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_stru_no_params() {
    let input = "STRU\r\n";
    assert_eq!(parse(input), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_stru_f() {
    let input = "STRU F\r\n";
    assert_eq!(parse(input).unwrap(), Command::Stru { structure: StruParam::File });
}

#[test]
fn parse_stru_r() {
    let input = "STRU R\r\n";
    assert_eq!(parse(input).unwrap(), Command::Stru { structure: StruParam::Record });
}

#[test]
fn parse_stru_p() {
    let input = "STRU P\r\n";
    assert_eq!(parse(input).unwrap(), Command::Stru { structure: StruParam::Page });
}

#[test]
fn parse_stru_garbage() {
    let input = "STRU FSK\r\n";
    assert_eq!(parse(input), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_mode_s() {
    let input = "MODE S\r\n";
    assert_eq!(parse(input).unwrap(), Command::Mode { mode: ModeParam::Stream });
}

#[test]
fn parse_mode_b() {
    let input = "MODE B\r\n";
    assert_eq!(parse(input).unwrap(), Command::Mode { mode: ModeParam::Block });
}

#[test]
fn parse_mode_c() {
    let input = "MODE C\r\n";
    assert_eq!(parse(input).unwrap(), Command::Mode { mode: ModeParam::Compressed });
}

#[test]
fn parse_type_ascii() {
    assert_eq!(parse("TYPE A\r\n").unwrap(), Command::Type { type_: TypeParam::Ascii });
    assert_eq!(parse("TYPE A N\r\n").unwrap(), Command::Type { type_: TypeParam::Ascii });
}

#[test]
fn parse_type_ebcdic() {
    assert_eq!(parse("TYPE E\r\n").unwrap(), Command::Type { type_: TypeParam::Ebcdic });
}

#[test]
fn parse_type_image() {
    assert_eq!(parse("TYPE I\r\n").unwrap(), Command::Type { type_: TypeParam::Image });
}

#[test]
fn parse_type_local() {
    assert_eq!(parse("TYPE L 8\r\n").unwrap(), Command::Type { type_: TypeParam::Local(8) });
}

#[test]
fn parse_type_garbage() {
    assert_eq!(parse("TYPE X\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
    assert_eq!(parse("TYPE\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_port_valid() {
    assert_eq!(
        parse("PORT 127,0,0,1,4,1\r\n").unwrap(),
        Command::Port {
            host: "127.0.0.1".parse().unwrap(),
            port: 4 * 256 + 1,
        }
    );
}

#[test]
fn parse_port_garbage() {
    assert_eq!(parse("PORT\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
    assert_eq!(parse("PORT 127,0,0,1,4\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
    assert_eq!(parse("PORT 300,0,0,1,4,1\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_rest_valid() {
    assert_eq!(parse("REST 1024\r\n").unwrap(), Command::Rest { offset: 1024 });
}

#[test]
fn parse_rest_garbage() {
    assert_eq!(parse("REST fifty\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
    assert_eq!(parse("REST\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_retr_requires_a_path() {
    assert_eq!(parse("RETR\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
    assert_eq!(parse("RETR a file.txt\r\n").unwrap(), Command::Retr { path: "a file.txt".into() });
}

#[test]
fn parse_list_with_options() {
    assert_eq!(
        parse("LIST -la tmp\r\n").unwrap(),
        Command::List {
            options: Some("-la".into()),
            path: Some("tmp".into()),
        }
    );
    assert_eq!(parse("LIST\r\n").unwrap(), Command::List { options: None, path: None });
}

#[test]
fn parse_noop_with_params_is_rejected() {
    assert_eq!(parse("NOOP argument\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_opts_utf8() {
    assert_eq!(parse("OPTS UTF8 ON\r\n").unwrap(), Command::Opts { option: Opt::Utf8 { on: true } });
    assert_eq!(parse("OPTS UTF8 OFF\r\n").unwrap(), Command::Opts { option: Opt::Utf8 { on: false } });
    assert_eq!(parse("OPTS MLST type\r\n"), Err(ParseError::from(ParseErrorKind::InvalidCommand)));
}

#[test]
fn parse_unknown_verb() {
    assert_eq!(
        parse("XYZZY plugh\r\n").unwrap(),
        Command::Other {
            command_name: "XYZZY".into(),
            arguments: "plugh".into(),
        }
    );
}

#[test]
fn parse_non_utf8_is_rejected() {
    let input = b"USER \xE4\xB8\r\n";
    assert_eq!(parse(&input[..]), Err(ParseError::from(ParseErrorKind::InvalidUtf8)));
}
