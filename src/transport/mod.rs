//! Outbound command transport.
//!
//! Sends each command token as a single UDP datagram to the configured
//! consumer, fire-and-forget: no framing, no acknowledgment, no retry. A
//! failed send is logged and dropped; the next edge or tick naturally resends
//! the then-correct command.

use crate::control::Command;
use thiserror::Error;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Transport configuration.
#[derive(Clone, Debug)]
pub struct EmitterSettings {
    /// Consumer address, `host:port`.
    pub target_addr: String,
}

impl Default for EmitterSettings {
    fn default() -> Self {
        Self {
            target_addr: "127.0.0.1:6006".to_string(),
        }
    }
}

/// Errors from the command emitter.
#[derive(Debug, Error)]
pub enum EmitterError {
    #[error("Failed to set up command socket: {0}")]
    SocketError(#[from] std::io::Error),
}

/// Drains the command channel and forwards exact ASCII tokens.
///
/// No deduplication happens here: repeated presses are valid in continuous
/// mode, and the producers already guarantee edge-triggered emission in
/// discrete mode.
struct CommandEmitter {
    socket: UdpSocket,
    command_receiver: mpsc::Receiver<Command>,
    sent: usize,
    dropped: usize,
}

impl CommandEmitter {
    async fn run(mut self) {
        while let Some(command) = self.command_receiver.recv().await {
            match self.socket.send(command.token().as_bytes()).await {
                Ok(_) => {
                    self.sent += 1;
                    debug!("Sent {}", command);
                }
                Err(e) => {
                    self.dropped += 1;
                    warn!("Dropping {}: send failed: {}", command, e);
                }
            }
        }
        info!(
            "Command channel closed, emitter stopping ({} sent, {} dropped)",
            self.sent, self.dropped
        );
    }
}

/// Handle for the emitter task.
///
/// The task ends on its own once every command sender is gone; [`join`]
/// blocks until the channel has been drained, so the socket never closes with
/// commands still queued.
///
/// [`join`]: EmitterHandle::join
#[derive(Debug)]
pub struct EmitterHandle {
    task_handle: Option<JoinHandle<()>>,
}

impl EmitterHandle {
    /// Binds an ephemeral local socket, connects it to the consumer, and
    /// spawns the drain loop.
    pub async fn spawn(
        settings: EmitterSettings,
        command_receiver: mpsc::Receiver<Command>,
    ) -> Result<Self, EmitterError> {
        let socket = UdpSocket::bind("0.0.0.0:0").await?;
        socket.connect(&settings.target_addr).await?;
        info!("Command emitter connected to {}", settings.target_addr);

        let emitter = CommandEmitter {
            socket,
            command_receiver,
            sent: 0,
            dropped: 0,
        };
        let task_handle = tokio::spawn(emitter.run());

        Ok(Self {
            task_handle: Some(task_handle),
        })
    }

    /// Waits for the drain loop to finish. Call only after the producers have
    /// been joined, otherwise this waits for them.
    pub async fn join(&mut self) {
        if let Some(handle) = self.task_handle.take() {
            if let Err(e) = handle.await {
                error!("Emitter task panicked: {}", e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    async fn recv_token(socket: &UdpSocket) -> String {
        let mut buf = [0u8; 64];
        let len = tokio::time::timeout(Duration::from_secs(2), socket.recv(&mut buf))
            .await
            .expect("timed out waiting for datagram")
            .expect("recv failed");
        String::from_utf8(buf[..len].to_vec()).unwrap()
    }

    #[tokio::test]
    async fn tokens_arrive_verbatim_one_datagram_each() {
        let consumer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target_addr = consumer.local_addr().unwrap().to_string();

        let (command_tx, command_rx) = mpsc::channel(16);
        let mut emitter = EmitterHandle::spawn(EmitterSettings { target_addr }, command_rx)
            .await
            .unwrap();

        command_tx.send(Command::PressLeft).await.unwrap();
        command_tx.send(Command::ReleaseLeft).await.unwrap();
        command_tx.send(Command::Fire).await.unwrap();

        assert_eq!(recv_token(&consumer).await, "P_LEFT");
        assert_eq!(recv_token(&consumer).await, "R_LEFT");
        assert_eq!(recv_token(&consumer).await, "FIRE");

        drop(command_tx);
        emitter.join().await;
    }

    #[tokio::test]
    async fn emitter_drains_queue_before_stopping() {
        let consumer = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let target_addr = consumer.local_addr().unwrap().to_string();

        let (command_tx, command_rx) = mpsc::channel(16);
        let mut emitter = EmitterHandle::spawn(EmitterSettings { target_addr }, command_rx)
            .await
            .unwrap();

        // Queue a release and close the channel before the emitter has
        // necessarily run: the join must still flush it onto the wire.
        command_tx.send(Command::ReleaseUp).await.unwrap();
        drop(command_tx);
        emitter.join().await;

        assert_eq!(recv_token(&consumer).await, "R_UP");
    }
}
