use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use shared::protocol::{AGENT_HANDSHAKE, SERVER_GREETING};
use shared::TeamColor;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::time::Instant;
use tracing::{debug, info, warn};

use super::commands::CommandTable;
use super::SharedMap;

pub const BAD_HANDSHAKE: &str = "fail Unrecognized handshake";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Greeting sent, waiting for `agent 1`.
    Unestablished,
    Established,
    Closed,
}

/// Protocol state of one agent connection.
pub struct Session {
    team: usize,
    color: TeamColor,
    state: SessionState,
    connected: Instant,
}

impl Session {
    pub fn new(team: usize, color: TeamColor) -> Self {
        Self {
            team,
            color,
            state: SessionState::Unestablished,
            connected: Instant::now(),
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Handles one received line and returns the lines to send back.
    pub async fn handle_line(
        &mut self,
        line: &str,
        map: &SharedMap,
        table: &CommandTable,
    ) -> Vec<String> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        if tokens.is_empty() {
            return Vec::new();
        }
        match self.state {
            SessionState::Unestablished => {
                if tokens.join(" ") == AGENT_HANDSHAKE {
                    info!(team = %self.color, "agent connected");
                    self.state = SessionState::Established;
                    Vec::new()
                } else {
                    warn!(team = %self.color, line, "unrecognized handshake");
                    self.state = SessionState::Closed;
                    vec![BAD_HANDSHAKE.to_string()]
                }
            }
            SessionState::Established => {
                let elapsed = self.connected.elapsed().as_secs_f64();
                let response = {
                    let mut map = map.lock().await;
                    table.dispatch(&mut map, self.team, elapsed, &tokens)
                };
                if response.close {
                    self.state = SessionState::Closed;
                }
                response.lines
            }
            SessionState::Closed => Vec::new(),
        }
    }
}

/// Drives a connection until `quit`, a bad handshake, EOF or an I/O error.
pub async fn serve(
    stream: TcpStream,
    peer: SocketAddr,
    team: usize,
    color: TeamColor,
    map: SharedMap,
    table: Arc<CommandTable>,
) -> io::Result<()> {
    info!(team = %color, %peer, "connection accepted");
    let (read_half, mut write_half) = stream.into_split();
    let mut reader = BufReader::new(read_half).lines();
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let write_task = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if write_half.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            if write_half.write_all(b"\n").await.is_err() {
                break;
            }
        }
        let _ = write_half.shutdown().await;
    });

    let send = |line: String| {
        debug!(team = %color, "send: {line}");
        let _ = tx.send(line);
    };

    send(SERVER_GREETING.to_string());
    let mut session = Session::new(team, color);
    let result = loop {
        let line = match reader.next_line().await {
            Ok(Some(line)) => line,
            Ok(None) => break Ok(()),
            Err(err) => break Err(err),
        };
        debug!(team = %color, "recv: {line}");
        for reply in session.handle_line(&line, &map, &table).await {
            send(reply);
        }
        if session.state() == SessionState::Closed {
            break Ok(());
        }
    };

    // flush whatever is queued before the socket goes away
    drop(tx);
    let _ = write_task.await;
    info!(team = %color, %peer, "connection closed");
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::GameConfig;
    use crate::game::Map;
    use shared::world::{Base, World};
    use shared::Vec2;
    use tokio::sync::Mutex;

    fn shared_map() -> SharedMap {
        let mut world = World::new(200.0, 200.0);
        world
            .bases
            .push(Base::new(TeamColor::Green, Vec2::new(0.0, 50.0), Vec2::new(10.0, 10.0), 0.0));
        let config = GameConfig {
            default_tanks: 2,
            random_seed: Some(5),
            ..GameConfig::default()
        };
        Arc::new(Mutex::new(Map::new(Arc::new(config), world).unwrap()))
    }

    #[tokio::test]
    async fn test_handshake_then_commands() {
        let map = shared_map();
        let table = CommandTable::standard();
        let mut session = Session::new(0, TeamColor::Green);

        assert!(session.handle_line("   ", &map, &table).await.is_empty());
        assert_eq!(session.state(), SessionState::Unestablished);
        assert!(session.handle_line("agent 1", &map, &table).await.is_empty());
        assert_eq!(session.state(), SessionState::Established);

        let lines = session.handle_line("teams", &map, &table).await;
        assert!(lines[0].starts_with("ack "));
        assert!(lines[0].ends_with(" teams"));
        assert_eq!(lines[1..], ["begin", "team green 2", "end"]);

        let lines = session.handle_line("quit", &map, &table).await;
        assert_eq!(lines[1], "ok");
        assert_eq!(session.state(), SessionState::Closed);
    }

    #[test]
    fn test_bad_handshake_closes() {
        let map = shared_map();
        let table = CommandTable::standard();
        let mut session = Session::new(0, TeamColor::Green);
        let lines = tokio_test::block_on(session.handle_line("agent 2", &map, &table));
        assert_eq!(lines, vec![BAD_HANDSHAKE]);
        assert_eq!(session.state(), SessionState::Closed);
        assert!(tokio_test::block_on(session.handle_line("agent 1", &map, &table)).is_empty());
    }

    #[tokio::test]
    async fn test_commands_before_handshake_are_rejected() {
        let map = shared_map();
        let table = CommandTable::standard();
        let mut session = Session::new(0, TeamColor::Green);
        let lines = session.handle_line("mytanks", &map, &table).await;
        assert_eq!(lines, vec![BAD_HANDSHAKE]);
    }
}
