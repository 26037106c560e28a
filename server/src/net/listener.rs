use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use shared::TeamColor;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::sleep;
use tracing::{info, warn};

use super::commands::CommandTable;
use super::session;
use super::SharedMap;

/// Pause after a failed accept, e.g. when out of file descriptors.
const ACCEPT_RETRY: Duration = Duration::from_millis(100);

/// Listening socket for one team. Only one agent may be connected at a time;
/// further connections are closed without a word.
pub struct TeamListener {
    pub team: usize,
    pub color: TeamColor,
    listener: TcpListener,
    in_use: Arc<AtomicBool>,
}

/// Frees the team slot when the session ends, however it ends.
struct SlotGuard(Arc<AtomicBool>);

impl Drop for SlotGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl TeamListener {
    /// Port 0 picks an ephemeral port.
    pub async fn bind(host: &str, port: u16, team: usize, color: TeamColor) -> io::Result<Self> {
        let listener = TcpListener::bind((host, port)).await?;
        Ok(Self {
            team,
            color,
            listener,
            in_use: Arc::new(AtomicBool::new(false)),
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    pub async fn run(self, map: SharedMap, table: Arc<CommandTable>) -> io::Result<()> {
        info!(team = %self.color, port = self.local_addr()?.port(), "listening");
        loop {
            let accepted = self.listener.accept().await;
            if !self.admit(accepted, &map, &table) {
                sleep(ACCEPT_RETRY).await;
            }
        }
    }

    /// Starts a session for an accepted connection. Returns false when the
    /// accept itself failed; the listener stays up either way.
    fn admit(
        &self,
        accepted: io::Result<(TcpStream, SocketAddr)>,
        map: &SharedMap,
        table: &Arc<CommandTable>,
    ) -> bool {
        let (stream, peer) = match accepted {
            Ok(conn) => conn,
            Err(err) => {
                warn!(team = %self.color, "accept failed: {err}");
                return false;
            }
        };
        if self.in_use.swap(true, Ordering::SeqCst) {
            warn!(team = %self.color, %peer, "team already has an agent, dropping connection");
            return true;
        }
        let guard = SlotGuard(Arc::clone(&self.in_use));
        let (team, color) = (self.team, self.color);
        let map = Arc::clone(map);
        let table = Arc::clone(table);
        tokio::spawn(async move {
            let _guard = guard;
            if let Err(err) = session::serve(stream, peer, team, color, map, table).await {
                warn!(team = %color, %peer, "session error: {err}");
            }
        });
        true
    }
}
