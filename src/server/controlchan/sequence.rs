//! The command catalog: every verb the engine knows, which verbs may
//! legally follow it, and the admissibility rule the dispatcher applies
//! before executing anything.

use crate::auth::UserDetail;
use crate::server::controlchan::{error::ControlChanError, middleware::ControlChanMiddleware, Event, Reply, ReplyCode};
use crate::server::session::SharedSession;
use crate::storage::StorageBackend;

use async_trait::async_trait;

/// The tag of a control-channel verb, detached from its arguments.
/// `Connection` stands for the freshly-accepted connection before any
/// command arrived; `Unknown` for verbs outside the catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandCode {
    Connection,
    User,
    Pass,
    Acct,
    Cwd,
    Cdup,
    Quit,
    Rein,
    Port,
    Pasv,
    Type,
    Stru,
    Mode,
    Retr,
    Stor,
    Stou,
    Appe,
    Allo,
    Rest,
    Rnfr,
    Rnto,
    Abor,
    Dele,
    Rmd,
    Mkd,
    Pwd,
    List,
    Nlst,
    Site,
    Syst,
    Stat,
    Help,
    Noop,
    Feat,
    Opts,
    Unknown,
}

use CommandCode::*;

impl CommandCode {
    /// Every code, for exhaustive checks.
    pub const ALL: &'static [CommandCode] = &[
        Connection, User, Pass, Acct, Cwd, Cdup, Quit, Rein, Port, Pasv, Type, Stru, Mode, Retr, Stor, Stou, Appe, Allo, Rest, Rnfr, Rnto,
        Abor, Dele, Rmd, Mkd, Pwd, List, Nlst, Site, Syst, Stat, Help, Noop, Feat, Opts, Unknown,
    ];

    /// The special commands are admissible regardless of what came before.
    pub fn is_special(self) -> bool {
        matches!(self, Quit | Abor | Stat | Noop)
    }

    /// The closed set of verbs that may follow this one. An empty slice
    /// means unrestricted.
    pub fn next_valids(self) -> &'static [CommandCode] {
        match self {
            Connection => &[User, Feat],
            User => &[Pass, User, Quit],
            Rnfr => &[Rnto],
            Rest => &[Retr, Stor, Stou, Appe],
            Port | Pasv => &[Retr, Stor, Stou, Appe, List, Nlst],
            _ => &[],
        }
    }
}

/// Judges whether `next` may follow `prev`. `extra_next` is the one-shot
/// widening a multi-step command installed (RNFR arms RNTO).
pub fn admissible(prev: CommandCode, extra_next: Option<CommandCode>, next: CommandCode) -> bool {
    if next.is_special() {
        return true;
    }
    if extra_next == Some(next) {
        return true;
    }
    let valids = prev.next_valids();
    valids.is_empty() || valids.contains(&next)
}

// Middleware that rejects out-of-sequence commands with 503 before they can
// have any side effect, and maintains the session's command window: commands
// that executed to a non-negative reply rotate into the window, rejected
// ones roll it back. The restart marker survives only REST itself and the
// transfer verb that consumes it.
pub struct SequenceMiddleware<Storage, User, Next>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
    Next: ControlChanMiddleware,
{
    pub session: SharedSession<Storage, User>,
    pub next: Next,
}

#[async_trait]
impl<Storage, User, Next> ControlChanMiddleware for SequenceMiddleware<Storage, User, Next>
where
    Storage: StorageBackend<User> + 'static,
    User: UserDetail + 'static,
    Next: ControlChanMiddleware,
{
    async fn handle(&mut self, event: Event) -> Result<Reply, ControlChanError> {
        let code = if let Event::Command(command) = &event {
            command.code()
        } else {
            // Internal messages are not commands and bypass sequencing.
            return self.next.handle(event).await;
        };

        // Verbs outside the catalog render 500 downstream; judging their
        // sequence would turn every typo into a misleading 503.
        if code == CommandCode::Unknown {
            return self.next.handle(event).await;
        }

        {
            let mut session = self.session.lock().await;
            if !admissible(session.current_command, session.extra_next, code) {
                return Ok(Reply::new(ReplyCode::BadCommandSequence, "Bad sequence of commands"));
            }
            session.set_current_command(code);
        }

        let result = self.next.handle(event).await;

        let mut session = self.session.lock().await;
        match &result {
            Ok(reply) if !reply.is_negative() => {
                if code != CommandCode::Rnfr {
                    session.extra_next = None;
                }
                if !matches!(code, Rest | Retr | Stor | Stou | Appe) {
                    session.restart = None;
                }
            }
            _ => session.invalidate_current_command(),
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    // The admissibility rule, checked exhaustively over the catalog.
    #[test]
    fn specials_are_always_admissible() {
        for &prev in CommandCode::ALL {
            for &special in &[Quit, Abor, Stat, Noop] {
                assert!(admissible(prev, None, special), "{:?} should admit {:?}", prev, special);
            }
        }
    }

    #[test]
    fn unrestricted_predecessors_admit_everything() {
        for &prev in CommandCode::ALL {
            if !prev.next_valids().is_empty() {
                continue;
            }
            for &next in CommandCode::ALL {
                assert!(admissible(prev, None, next), "{:?} should admit {:?}", prev, next);
            }
        }
    }

    #[test]
    fn restricted_predecessors_admit_only_their_set() {
        for &prev in CommandCode::ALL {
            let valids = prev.next_valids();
            if valids.is_empty() {
                continue;
            }
            for &next in CommandCode::ALL {
                let expected = next.is_special() || valids.contains(&next);
                assert_eq!(admissible(prev, None, next), expected, "prev {:?} next {:?}", prev, next);
            }
        }
    }

    #[test]
    fn extra_next_widens_by_exactly_one_verb() {
        assert!(admissible(Rnfr, Some(Rnto), Rnto));
        assert!(!admissible(Rnfr, Some(Rnto), Stor));
        // The widening applies on top of a restricted set.
        assert!(admissible(User, Some(Feat), Feat));
        assert!(!admissible(User, None, Feat));
    }

    #[test]
    fn canonical_sets() {
        assert_eq!(User.next_valids(), &[Pass, User, Quit]);
        assert_eq!(Rnfr.next_valids(), &[Rnto]);
        assert_eq!(Rest.next_valids(), &[Retr, Stor, Stou, Appe]);
        assert_eq!(Pasv.next_valids(), &[Retr, Stor, Stou, Appe, List, Nlst]);
        assert_eq!(Port.next_valids(), Pasv.next_valids());
        assert!(Mode.next_valids().is_empty());
        assert!(Type.next_valids().is_empty());
        assert!(Stru.next_valids().is_empty());
        assert!(Pass.next_valids().is_empty());
    }

    #[test]
    fn fresh_connections_expect_login() {
        assert!(admissible(Connection, None, User));
        assert!(admissible(Connection, None, Feat));
        assert!(admissible(Connection, None, Quit));
        assert!(!admissible(Connection, None, Retr));
        assert!(!admissible(Connection, None, Pass));
    }
}
