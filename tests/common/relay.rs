//! Fake chat relay on a local TCP port.
//!
//! Accepts a single connection, exposes the lines the ingestor sends, and lets
//! the test push raw relay text back. Every read is bounded by a timeout so a
//! broken ingestor fails the test instead of hanging it.
#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::{TcpListener, TcpStream};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

pub struct FakeRelay {
    listener: TcpListener,
}

impl FakeRelay {
    pub async fn bind() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind fake relay");
        Self { listener }
    }

    pub fn port(&self) -> u16 {
        self.listener.local_addr().expect("local addr").port()
    }

    /// Accept without the timeout, for asserting that nobody connects.
    pub async fn accept_raw(&self) -> std::io::Result<(TcpStream, SocketAddr)> {
        self.listener.accept().await
    }

    pub async fn accept(&self) -> RelayConn {
        let (stream, _) = tokio::time::timeout(READ_TIMEOUT, self.listener.accept())
            .await
            .expect("ingestor never connected")
            .expect("accept");
        let (read, write) = stream.into_split();
        RelayConn {
            reader: BufReader::new(read),
            writer: write,
        }
    }
}

pub struct RelayConn {
    reader: BufReader<OwnedReadHalf>,
    writer: OwnedWriteHalf,
}

impl RelayConn {
    /// Next line from the ingestor, without its terminator. `None` on EOF.
    pub async fn next_line(&mut self) -> Option<String> {
        let mut line = String::new();
        let n = tokio::time::timeout(READ_TIMEOUT, self.reader.read_line(&mut line))
            .await
            .expect("timed out waiting for the ingestor")
            .expect("read from ingestor");
        (n > 0).then(|| line.trim_end().to_string())
    }

    /// The three handshake lines.
    pub async fn handshake(&mut self) -> Vec<String> {
        let mut lines = Vec::new();
        for _ in 0..3 {
            lines.push(self.next_line().await.expect("handshake line"));
        }
        lines
    }

    pub async fn send(&mut self, raw: &str) {
        self.writer.write_all(raw.as_bytes()).await.expect("write to ingestor");
        self.writer.flush().await.expect("flush to ingestor");
    }

    /// Send a PING and wait for the PONG. Lines are handled in order, so once
    /// this returns every line sent before it has been processed.
    pub async fn sync(&mut self) {
        self.send(super::PING).await;
        assert_eq!(self.next_line().await.as_deref(), Some(super::PONG));
    }

    /// Hang up on the ingestor.
    pub fn close(self) {
        drop(self);
    }
}
