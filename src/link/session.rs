use std::time::Duration;

use futures::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::codec::Framed;
use tracing::{debug, info, warn};

use crate::core::{Dialect, Result};
use crate::driver::{Driver, Notification};
use crate::protocol::codec::TsipCodec;
use crate::protocol::command::Command;

/// Why a session ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The transport reached end of stream
    Closed,
    /// The driver asked for the link to be reopened with this dialect
    Reconnect(Dialect),
}

/// Drives a [Driver] over an async byte transport.
pub struct Session<T> {
    framed: Framed<T, TsipCodec>,
    driver: Driver,
    idle_poll: Duration,
    notifications: Option<mpsc::Sender<Notification>>,
    commands: Option<mpsc::Receiver<Command>>,
}

async fn next_command(commands: &mut Option<mpsc::Receiver<Command>>) -> Option<Command> {
    match commands {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

impl<T> Session<T>
where
    T: AsyncRead + AsyncWrite + Unpin,
{
    /// Creates a session. `idle_poll` paces the request cycle when no
    /// primary timing arrives.
    pub fn new(io: T, driver: Driver, idle_poll: Duration) -> Self {
        let codec = TsipCodec::new(driver.config());
        Session {
            framed: Framed::new(io, codec),
            driver,
            idle_poll,
            notifications: None,
            commands: None,
        }
    }

    /// Publishes notifications on `tx`. A full channel drops the notification.
    pub fn with_notifications(mut self, tx: mpsc::Sender<Notification>) -> Self {
        self.notifications = Some(tx);
        self
    }

    /// Accepts commands to send to the receiver from `rx`
    pub fn with_commands(mut self, rx: mpsc::Receiver<Command>) -> Self {
        self.commands = Some(rx);
        self
    }

    pub fn driver(&self) -> &Driver {
        &self.driver
    }

    /// Ends the session, keeping the driver and its state for the next link
    pub fn into_driver(mut self) -> Driver {
        self.driver.link_reset();
        self.driver
    }

    fn publish(&self, notification: Notification) {
        if let Some(tx) = &self.notifications {
            if let Err(e) = tx.try_send(notification) {
                debug!("notification dropped: {}", e);
            }
        }
    }

    async fn flush_outgoing(&mut self) -> Result<()> {
        let pending: Vec<Command> = self.driver.drain_outgoing().collect();
        if pending.is_empty() {
            return Ok(());
        }
        for command in pending {
            self.framed.feed(command).await?;
        }
        self.framed.flush().await
    }

    /// Runs until the transport closes or the driver escalates to a reconnect.
    pub async fn run(&mut self) -> Result<SessionExit> {
        let mut idle = interval_at(Instant::now() + self.idle_poll, self.idle_poll);
        idle.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!("session started");

        loop {
            self.flush_outgoing().await?;
            if let Some(dialect) = self.driver.take_reconnect() {
                warn!(?dialect, "session ending for reconnect");
                return Ok(SessionExit::Reconnect(dialect));
            }

            tokio::select! {
                frame = self.framed.next() => match frame {
                    Some(Ok(event)) => {
                        if let Some(notification) = self.driver.handle_event(event) {
                            self.publish(notification);
                        }
                    }
                    Some(Err(e)) => return Err(e),
                    None => {
                        info!("transport closed");
                        return Ok(SessionExit::Closed);
                    }
                },

                _ = idle.tick() => self.driver.on_idle(),

                Some(command) = next_command(&mut self.commands) => self.driver.send(command),
            }
        }
    }
}
