//! Async BZRC client.
//!
//! Connects to one team's port, performs the handshake and exposes each
//! protocol command as a typed method. Commands are strictly
//! request/response: every call waits for the `ack` and the full reply.

use std::str::FromStr;

use shared::protocol::{
    Ack, BaseRecord, ConstantRecord, FlagRecord, MyTank, ObstacleRecord, OtherTank, RecordError,
    ShotRecord, TeamRecord, TimerRecord, AGENT_HANDSHAKE, BEGIN, END, FAIL, OK, SERVER_GREETING,
};
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, Lines};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpStream, ToSocketAddrs};
use tracing::trace;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server closed the connection")]
    Closed,
    #[error("expected {expected}, got '{got}'")]
    Unexpected { expected: &'static str, got: String },
    #[error("server refused: {0}")]
    Failed(String),
    #[error(transparent)]
    Record(#[from] RecordError),
}

pub struct BzrcClient {
    reader: Lines<BufReader<OwnedReadHalf>>,
    writer: OwnedWriteHalf,
}

impl BzrcClient {
    pub async fn connect(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr).await?;
        let (read_half, writer) = stream.into_split();
        let mut client = Self {
            reader: BufReader::new(read_half).lines(),
            writer,
        };
        let greeting = client.read_line().await?;
        if greeting != SERVER_GREETING {
            return Err(ClientError::Unexpected {
                expected: "server greeting",
                got: greeting,
            });
        }
        client.send_line(AGENT_HANDSHAKE).await?;
        Ok(client)
    }

    async fn read_line(&mut self) -> Result<String, ClientError> {
        let line = self.reader.next_line().await?.ok_or(ClientError::Closed)?;
        trace!("recv: {line}");
        Ok(line)
    }

    async fn send_line(&mut self, line: &str) -> Result<(), ClientError> {
        trace!("send: {line}");
        self.writer.write_all(line.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        Ok(())
    }

    /// Sends a command and consumes its `ack`.
    async fn command(&mut self, line: &str) -> Result<Ack, ClientError> {
        self.send_line(line).await?;
        let reply = self.read_line().await?;
        if reply.starts_with(FAIL) {
            return Err(ClientError::Failed(reply));
        }
        Ok(reply.parse()?)
    }

    async fn read_bool(&mut self) -> Result<bool, ClientError> {
        let line = self.read_line().await?;
        match line.split_whitespace().next() {
            Some(OK) => Ok(true),
            Some(FAIL) => Ok(false),
            _ => Err(ClientError::Unexpected {
                expected: "ok or fail",
                got: line,
            }),
        }
    }

    async fn read_list<T>(&mut self) -> Result<Vec<T>, ClientError>
    where
        T: FromStr<Err = RecordError>,
    {
        let first = self.read_line().await?;
        if first.starts_with(FAIL) {
            return Err(ClientError::Failed(first));
        }
        if first != BEGIN {
            return Err(ClientError::Unexpected {
                expected: "begin",
                got: first,
            });
        }
        let mut items = Vec::new();
        loop {
            let line = self.read_line().await?;
            if line == END {
                return Ok(items);
            }
            items.push(line.parse()?);
        }
    }

    pub async fn shoot(&mut self, tank: usize) -> Result<bool, ClientError> {
        self.command(&format!("shoot {tank}")).await?;
        self.read_bool().await
    }

    pub async fn speed(&mut self, tank: usize, value: f32) -> Result<bool, ClientError> {
        self.command(&format!("speed {tank} {value}")).await?;
        self.read_bool().await
    }

    pub async fn angvel(&mut self, tank: usize, value: f32) -> Result<bool, ClientError> {
        self.command(&format!("angvel {tank} {value}")).await?;
        self.read_bool().await
    }

    pub async fn mytanks(&mut self) -> Result<Vec<MyTank>, ClientError> {
        self.command("mytanks").await?;
        self.read_list().await
    }

    pub async fn othertanks(&mut self) -> Result<Vec<OtherTank>, ClientError> {
        self.command("othertanks").await?;
        self.read_list().await
    }

    pub async fn flags(&mut self) -> Result<Vec<FlagRecord>, ClientError> {
        self.command("flags").await?;
        self.read_list().await
    }

    pub async fn shots(&mut self) -> Result<Vec<ShotRecord>, ClientError> {
        self.command("shots").await?;
        self.read_list().await
    }

    /// Fails with [`ClientError::Failed`] when the server hides obstacles.
    pub async fn obstacles(&mut self) -> Result<Vec<ObstacleRecord>, ClientError> {
        self.command("obstacles").await?;
        self.read_list().await
    }

    pub async fn bases(&mut self) -> Result<Vec<BaseRecord>, ClientError> {
        self.command("bases").await?;
        self.read_list().await
    }

    pub async fn constants(&mut self) -> Result<Vec<ConstantRecord>, ClientError> {
        self.command("constants").await?;
        self.read_list().await
    }

    pub async fn teams(&mut self) -> Result<Vec<TeamRecord>, ClientError> {
        self.command("teams").await?;
        self.read_list().await
    }

    pub async fn timer(&mut self) -> Result<TimerRecord, ClientError> {
        self.command("timer").await?;
        Ok(self.read_line().await?.parse()?)
    }

    /// Ends the session; the server closes the socket after `ok`.
    pub async fn quit(mut self) -> Result<(), ClientError> {
        self.command("quit").await?;
        if self.read_bool().await? {
            Ok(())
        } else {
            Err(ClientError::Failed("quit".to_string()))
        }
    }
}
