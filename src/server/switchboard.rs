//! The switchboard connects inbound passive data connections to the
//! session that is expecting them.

use crate::auth::UserDetail;
use crate::server::session::SharedSession;
use crate::storage::StorageBackend;

use dashmap::{DashMap, Entry};
use std::net::IpAddr;
use std::time::Duration;

// A client that connects to the advertised passive port before the control
// loop finished processing PASV is given this many chances to be matched.
const LOOKUP_RETRIES: u32 = 3;
const LOOKUP_RETRY_DELAY: Duration = Duration::from_millis(10);

/// Identifies the session a passive data connection belongs to: the client
/// source IP of the control connection plus the passive port that was
/// reserved for it in the 227 reply.
#[derive(PartialEq, Eq, Hash, Clone, Copy, Debug)]
pub struct SwitchboardKey {
    pub source: IpAddr,
    pub port: u16,
}

impl SwitchboardKey {
    pub fn new(source: IpAddr, port: u16) -> Self {
        SwitchboardKey { source, port }
    }
}

/// Registry of sessions awaiting a passive data connection.
#[derive(Debug)]
pub struct Switchboard<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    entries: DashMap<SwitchboardKey, SharedSession<Storage, User>>,
}

impl<Storage, User> Switchboard<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    pub fn new() -> Self {
        Switchboard { entries: DashMap::new() }
    }

    /// Claims a key for a session. Fails when another session already
    /// holds it, in which case the caller picks a different port.
    pub fn claim(&self, key: SwitchboardKey, session: SharedSession<Storage, User>) -> Result<(), ()> {
        match self.entries.entry(key) {
            Entry::Occupied(_) => Err(()),
            Entry::Vacant(entry) => {
                entry.insert(session);
                Ok(())
            }
        }
    }

    /// Releases a key. Idempotent.
    pub fn release(&self, key: &SwitchboardKey) {
        self.entries.remove(key);
    }

    /// Looks up the session owning `key`, tolerating the race where the
    /// client connects before the control side finished publishing the
    /// PASV reply: a bounded number of retries with a short sleep, then
    /// the caller closes the connection.
    pub async fn lookup_with_retry(&self, key: &SwitchboardKey) -> Option<SharedSession<Storage, User>> {
        for attempt in 0..LOOKUP_RETRIES {
            if let Some(entry) = self.entries.get(key) {
                return Some(entry.value().clone());
            }
            if attempt + 1 < LOOKUP_RETRIES {
                tokio::time::sleep(LOOKUP_RETRY_DELAY).await;
            }
        }
        None
    }
}

impl<Storage, User> Default for Switchboard<Storage, User>
where
    Storage: StorageBackend<User>,
    User: UserDetail,
{
    fn default() -> Self {
        Switchboard::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::DefaultUser;
    use crate::server::session::Session;
    use crate::storage::mem::Mem;
    use std::net::{Ipv4Addr, SocketAddr};
    use std::sync::Arc;
    use tokio::sync::Mutex;

    fn session() -> SharedSession<Mem, DefaultUser> {
        let source: SocketAddr = "127.0.0.1:40000".parse().unwrap();
        Arc::new(Mutex::new(Session::new(Arc::new(Mem::new()), source)))
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let board: Switchboard<Mem, DefaultUser> = Switchboard::new();
        let key = SwitchboardKey::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50001);
        assert!(board.claim(key, session()).is_ok());
        assert!(board.claim(key, session()).is_err());
        board.release(&key);
        assert!(board.claim(key, session()).is_ok());
    }

    #[tokio::test]
    async fn lookup_tolerates_late_publication() {
        let board: Arc<Switchboard<Mem, DefaultUser>> = Arc::new(Switchboard::new());
        let key = SwitchboardKey::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50002);
        let publisher = Arc::clone(&board);
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(5)).await;
            publisher.claim(key, session()).unwrap();
        });
        assert!(board.lookup_with_retry(&key).await.is_some());
    }

    #[tokio::test]
    async fn lookup_gives_up_eventually() {
        let board: Switchboard<Mem, DefaultUser> = Switchboard::new();
        let key = SwitchboardKey::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50003);
        assert!(board.lookup_with_retry(&key).await.is_none());
    }
}
