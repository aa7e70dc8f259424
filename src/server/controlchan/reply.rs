/// A reply to the FTP client.
#[derive(Debug, Clone, PartialEq)]
pub enum Reply {
    None,
    CodeAndMsg { code: ReplyCode, msg: String },
    MultiLine { code: ReplyCode, lines: Vec<String> },
}

/// Which of the five RFC 959 categories a reply code falls in. Every code
/// belongs to exactly one, determined by its first digit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReplyCategory {
    /// 1xx: the requested action is being initiated, expect another reply.
    Preliminary,
    /// 2xx: the requested action completed.
    Completion,
    /// 3xx: accepted, but the action is held pending further information.
    Intermediate,
    /// 4xx: not accepted right now, but the condition is temporary.
    TransientNegative,
    /// 5xx: not accepted, and retrying as-is will not help.
    PermanentNegative,
}

/// The reply codes according to RFC 959.
//
// The three digits form a code. The first digit is the only one a client
// can rely on: 1 mark, 2/3 acceptance, 4/5 rejection. The second digit is
// conventionally 0 for syntax, 1 for help, 2 for connections, 3 for
// accounting, 5 for the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
#[allow(dead_code)]
pub enum ReplyCode {
    RestartMarker = 110,
    InNMinutes = 120,
    ConnectionAlreadyOpen = 125,
    FileStatusOkay = 150,

    CommandOkay = 200,
    CommandOkayNotImplemented = 202,
    SystemStatus = 211,
    DirectoryStatus = 212,
    FileStatus = 213,
    HelpMessage = 214,
    SystemType = 215,
    ServiceReady = 220,
    ClosingControlConnection = 221,
    DataConnectionOpen = 225,
    ClosingDataConnection = 226,
    EnteringPassiveMode = 227,
    UserLoggedIn = 230,
    FileActionOkay = 250,
    DirCreated = 257,

    NeedPassword = 331,
    NeedAccount = 332,
    FileActionPending = 350,

    ServiceNotAvailable = 421,
    CantOpenDataConnection = 425,
    ConnectionClosed = 426,
    TransientFileError = 450,
    LocalError = 451,
    OutOfSpace = 452,

    CommandSyntaxError = 500,
    ParameterSyntaxError = 501,
    CommandNotImplemented = 502,
    BadCommandSequence = 503,
    CommandNotImplementedForParameter = 504,
    NotLoggedIn = 530,
    NeedAccountToStore = 532,
    FileError = 550,
    PageTypeUnknown = 551,
    ExceededStorageAllocation = 552,
    BadFileName = 553,
}

impl ReplyCode {
    /// The category the first digit of this code puts it in.
    pub fn category(self) -> ReplyCategory {
        match (self as u32) / 100 {
            1 => ReplyCategory::Preliminary,
            2 => ReplyCategory::Completion,
            3 => ReplyCategory::Intermediate,
            4 => ReplyCategory::TransientNegative,
            _ => ReplyCategory::PermanentNegative,
        }
    }
}

impl Reply {
    pub fn new(code: ReplyCode, message: &str) -> Self {
        Reply::CodeAndMsg {
            code,
            msg: message.to_string(),
        }
    }

    pub fn new_with_string(code: ReplyCode, msg: String) -> Self {
        Reply::CodeAndMsg { code, msg }
    }

    pub fn new_multiline<I>(code: ReplyCode, lines: I) -> Self
    where
        I: IntoIterator,
        I::Item: std::fmt::Display,
    {
        Reply::MultiLine {
            code,
            lines: lines.into_iter().map(|item| format!("{}", item)).collect(),
        }
    }

    // A no-reply
    pub fn none() -> Self {
        Reply::None
    }

    pub fn code(&self) -> Option<ReplyCode> {
        match self {
            Reply::None => None,
            Reply::CodeAndMsg { code, .. } | Reply::MultiLine { code, .. } => Some(*code),
        }
    }

    /// True for 1xx replies. The control loop uses this as the barrier that
    /// releases the data side: only after a preliminary reply has been
    /// flushed may data bytes follow.
    pub fn is_preliminary(&self) -> bool {
        matches!(self.code().map(ReplyCode::category), Some(ReplyCategory::Preliminary))
    }

    /// True for 4xx and 5xx replies.
    pub fn is_negative(&self) -> bool {
        matches!(
            self.code().map(ReplyCode::category),
            Some(ReplyCategory::TransientNegative) | Some(ReplyCategory::PermanentNegative)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn every_code_has_exactly_one_category() {
        assert_eq!(ReplyCode::FileStatusOkay.category(), ReplyCategory::Preliminary);
        assert_eq!(ReplyCode::ClosingDataConnection.category(), ReplyCategory::Completion);
        assert_eq!(ReplyCode::FileActionPending.category(), ReplyCategory::Intermediate);
        assert_eq!(ReplyCode::ConnectionClosed.category(), ReplyCategory::TransientNegative);
        assert_eq!(ReplyCode::BadCommandSequence.category(), ReplyCategory::PermanentNegative);
    }

    #[test]
    fn preliminary_and_negative_predicates() {
        assert!(Reply::new(ReplyCode::FileStatusOkay, "opening").is_preliminary());
        assert!(!Reply::new(ReplyCode::CommandOkay, "ok").is_preliminary());
        assert!(Reply::new(ReplyCode::NotLoggedIn, "no").is_negative());
        assert!(Reply::new(ReplyCode::TransientFileError, "busy").is_negative());
        assert!(!Reply::none().is_negative());
    }
}
