//! Connection lifecycle and the session worker loop.
//!
//! One logical worker per session: a single `select!` loop owns the
//! transport and interleaves three duties — reading lines, running due
//! scheduler work (keepalive ping, timeout checks, queue draining), and
//! processing host commands. No two duties ever run concurrently.
//!
//! The lifecycle is `Disconnected → Connecting → Authenticating →
//! Connected`, with any read/write failure, explicit disconnect, or
//! keepalive timeout dropping back to `Disconnected` and, after the
//! reconnect backoff, a fresh `Connecting` attempt. The host requests a
//! full stop with [`SessionHandle::stop`]; cancellation is cooperative
//! and observed at the next loop iteration.

use std::ops::ControlFlow;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::{sleep_until, Instant};
use tracing::{debug, info, trace};

use crate::config::Config;
use crate::dispatch::{Binds, Handler};
use crate::error::{Result, SessionError};
use crate::event::Event;
use crate::history::{ChannelHistory, ChannelLog};
use crate::identify::{IdentifyQueue, IdentifyVerdict};
use crate::queue::OutputQueue;
use crate::schedule::{
    Duty, Scheduler, PRIORITY_DRAIN, PRIORITY_KEEPALIVE, PRIORITY_TIMEOUT,
};
use crate::transport::Transport;

/// Lifecycle state of the connection. Owned by the session worker;
/// everything else only observes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Authenticating,
    Connected,
    Closing,
}

/// Host commands funneled into the worker loop.
#[derive(Debug)]
enum Op {
    Raw(String),
    Say { recipient: String, text: String },
    Join(String),
    Identify {
        nick: String,
        tx: oneshot::Sender<IdentifyVerdict>,
    },
    Disconnect { quit: String },
    Reconnect,
    Debugging(bool),
    Stop,
}

/// How an established connection ended.
enum SessionEnd {
    /// The host asked for it (disconnect, reconnect or stop).
    Requested,
    /// Transport or keepalive failure; the reconnect loop takes over.
    Failed(SessionError),
}

/// Cloneable handle for issuing commands to a running session.
///
/// Safe to use from any thread; commands are funneled to the worker
/// loop and processed in order. While no connection exists, sends are
/// dropped (with a debug log) rather than queued across reconnects.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    ops: mpsc::UnboundedSender<Op>,
}

impl SessionHandle {
    /// Queue a raw command line for paced transmission.
    pub fn send(&self, raw: impl Into<String>) {
        let _ = self.ops.send(Op::Raw(raw.into()));
    }

    /// Send a PRIVMSG to a channel or nick.
    pub fn say(&self, recipient: impl Into<String>, text: impl Into<String>) {
        let _ = self.ops.send(Op::Say {
            recipient: recipient.into(),
            text: text.into(),
        });
    }

    /// Join a channel and start keeping history for it.
    pub fn joinchan(&self, channel: impl Into<String>) {
        let _ = self.ops.send(Op::Join(channel.into()));
    }

    pub fn kick(&self, nick: &str, channel: &str, reason: &str) {
        self.send(format!("KICK {channel} {nick} :{reason}"));
    }

    pub fn ban(&self, mask: &str, channel: &str) {
        self.send(format!("MODE {channel} +b {mask}"));
    }

    pub fn unban(&self, mask: &str, channel: &str) {
        self.send(format!("MODE {channel} -b {mask}"));
    }

    pub fn topic(&self, channel: &str, text: &str) {
        self.send(format!("TOPIC {channel} :{text}"));
    }

    /// Ask whether `nick` is registered with services.
    ///
    /// Queues a WHOIS verification (at most one in flight at a time)
    /// and resolves when the matching numerics arrive.
    pub async fn identify(&self, nick: impl Into<String>) -> Result<IdentifyVerdict> {
        let (tx, rx) = oneshot::channel();
        self.ops
            .send(Op::Identify {
                nick: nick.into(),
                tx,
            })
            .map_err(|_| SessionError::Terminated)?;
        rx.await.map_err(|_| SessionError::Terminated)
    }

    /// Close the current connection with a QUIT message. The session
    /// reconnects after the backoff unless [`stop`](Self::stop) was
    /// also requested.
    pub fn disconnect(&self, quit: impl Into<String>) {
        let _ = self.ops.send(Op::Disconnect { quit: quit.into() });
    }

    /// Drop the current connection and reconnect immediately.
    pub fn reconnect(&self) {
        let _ = self.ops.send(Op::Reconnect);
    }

    /// Toggle per-line traffic tracing.
    pub fn debugging(&self, on: bool) {
        let _ = self.ops.send(Op::Debugging(on));
    }

    /// Request a full stop. Observed at the next loop iteration.
    pub fn stop(&self) {
        let _ = self.ops.send(Op::Stop);
    }

    #[cfg(test)]
    pub(crate) fn detached() -> Self {
        let (ops, _rx) = mpsc::unbounded_channel();
        Self { ops }
    }
}

/// A persistent, authenticated IRC session.
///
/// Construct with a validated [`Config`], register binds, then drive it
/// with [`run`](Self::run). `run` performs the connect itself: a failed
/// *initial* connect (socket refused, or no welcome within the connect
/// timeout) is returned as an error, while later outages feed the
/// silent reconnect loop.
pub struct Session {
    config: Config,
    binds: Binds,
    ops_tx: mpsc::UnboundedSender<Op>,
    ops_rx: mpsc::UnboundedReceiver<Op>,
    queue: OutputQueue,
    identify: IdentifyQueue,
    history: ChannelHistory,
    state: ConnectionState,
    debug_lines: bool,
    awaiting_pong: bool,
    ping_serial: u64,
    ever_connected: bool,
    stopping: bool,
}

impl Session {
    /// Create a session. Fails immediately on configuration misuse.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let (ops_tx, ops_rx) = mpsc::unbounded_channel();
        Ok(Self {
            config,
            binds: Binds::new(),
            ops_tx,
            ops_rx,
            queue: OutputQueue::new(),
            identify: IdentifyQueue::new(),
            history: ChannelHistory::new(),
            state: ConnectionState::Disconnected,
            debug_lines: false,
            awaiting_pong: false,
            ping_serial: 0,
            ever_connected: false,
            stopping: false,
        })
    }

    /// A handle for issuing commands from other tasks or threads.
    pub fn handle(&self) -> SessionHandle {
        SessionHandle {
            ops: self.ops_tx.clone(),
        }
    }

    /// Bind a handler for a command name. Last registration wins.
    pub fn bind<F>(&mut self, command: impl Into<String>, handler: F)
    where
        F: Fn(&SessionHandle, &Event) + Send + 'static,
    {
        self.binds.bind(command, Box::new(handler) as Handler);
    }

    /// Toggle per-line traffic tracing before the session runs.
    pub fn debugging(&mut self, on: bool) {
        self.debug_lines = on;
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// History recorded for a joined channel, if any.
    pub fn channel_log(&self, channel: &str) -> Option<&ChannelLog> {
        self.history.get(channel)
    }

    /// Connect and run until [`SessionHandle::stop`] is observed.
    ///
    /// Returns an error only when the first connection attempt fails;
    /// after a session has been established once, outages are retried
    /// indefinitely with the configured backoff.
    pub async fn run(&mut self) -> Result<()> {
        self.stopping = false;
        self.ever_connected = false;
        info!(
            network = %self.config.network,
            port = self.config.port,
            tls = self.config.tls,
            "session starting"
        );

        loop {
            if self.stopping {
                break;
            }
            match self.run_connection().await {
                Ok(SessionEnd::Requested) => {}
                Ok(SessionEnd::Failed(e)) => {
                    debug!("connection lost: {}", e);
                }
                Err(e) => {
                    self.state = ConnectionState::Disconnected;
                    if !self.ever_connected {
                        return Err(e);
                    }
                    debug!("connect attempt failed: {}", e);
                }
            }
            self.state = ConnectionState::Disconnected;
            if self.stopping {
                break;
            }
            self.backoff().await;
        }

        self.state = ConnectionState::Disconnected;
        info!("session stopped");
        Ok(())
    }

    /// One full connection: open, authenticate, run steady state.
    ///
    /// `Err` means the attempt never reached the welcome numeric (a
    /// failed connect); `Ok` carries how an established or host-ended
    /// connection finished.
    async fn run_connection(&mut self) -> Result<SessionEnd> {
        self.state = ConnectionState::Connecting;
        self.awaiting_pong = false;
        self.queue.clear();

        let mut transport = Transport::connect(&self.config).await?;
        self.state = ConnectionState::Authenticating;

        if let Some(pass) = self.config.password.clone() {
            self.queue.enqueue(format!("PASS {pass}"));
        }
        self.queue.enqueue(format!("NICK {}", self.config.nick));
        self.queue.enqueue(format!(
            "USER {} 0 * :{}",
            self.config.nick, self.config.realname
        ));

        let mut sched = Scheduler::new();
        sched.schedule_in(Duration::ZERO, PRIORITY_DRAIN, Duty::DrainQueue);
        sched.schedule_in(
            self.config.connect_timeout(),
            PRIORITY_TIMEOUT,
            Duty::ConnectTimeout,
        );
        sched.schedule_in(
            self.config.ping_interval(),
            PRIORITY_KEEPALIVE,
            Duty::Ping,
        );

        loop {
            let deadline = sched
                .next_deadline()
                .unwrap_or_else(|| Instant::now() + Duration::from_secs(60));

            tokio::select! {
                read = transport.read_line() => match read {
                    Ok(Some(line)) => {
                        if let Err(e) = self.on_line(&mut transport, &mut sched, line).await {
                            return self.connection_lost(e);
                        }
                    }
                    Ok(None) => return self.connection_lost(SessionError::ConnectionClosed),
                    Err(e) => return self.connection_lost(e),
                },
                _ = sleep_until(deadline) => {
                    let now = Instant::now();
                    while let Some(duty) = sched.pop_due(now) {
                        if let Err(e) = self.on_duty(&mut transport, &mut sched, duty).await {
                            return self.connection_lost(e);
                        }
                    }
                },
                op = self.ops_rx.recv() => match op {
                    Some(op) => {
                        if self.on_op(&mut transport, op).await.is_break() {
                            return Ok(SessionEnd::Requested);
                        }
                    }
                    None => {
                        self.stopping = true;
                        return Ok(SessionEnd::Requested);
                    }
                },
            }
        }
    }

    /// Route a terminal connection error: before the welcome it counts
    /// as a failed connect, afterwards it feeds the reconnect loop.
    fn connection_lost(&mut self, err: SessionError) -> Result<SessionEnd> {
        if self.state == ConnectionState::Connected {
            Ok(SessionEnd::Failed(err))
        } else {
            Err(err)
        }
    }

    async fn on_line(
        &mut self,
        transport: &mut Transport,
        sched: &mut Scheduler,
        line: String,
    ) -> Result<()> {
        if line.is_empty() {
            return Ok(());
        }
        if self.debug_lines {
            trace!("<- {}", line);
        }

        // The raw PING exchange never reaches the parser; the reply
        // bypasses the output queue to keep latency minimal.
        if line == "PING" || line.starts_with("PING ") {
            let token = line
                .split_whitespace()
                .nth(1)
                .unwrap_or("")
                .trim_start_matches(':');
            let reply = if token.is_empty() {
                "PONG".to_string()
            } else {
                format!("PONG {token}")
            };
            return self.send_now(transport, reply).await;
        }

        let Some(event) = Event::parse(&line) else {
            return Ok(());
        };

        match event.command.as_str() {
            "001" => {
                if self.state != ConnectionState::Connected {
                    self.state = ConnectionState::Connected;
                    self.ever_connected = true;
                    sched.cancel(Duty::ConnectTimeout);
                    info!(network = %self.config.network, "session established");
                    // A WHOIS lost with the previous connection is
                    // never answered; ask again for the queue head.
                    if let Some(nick) = self.identify.restart() {
                        self.queue.enqueue(format!("WHOIS {nick}"));
                    }
                }
            }
            "PONG" => {
                self.awaiting_pong = false;
                sched.cancel(Duty::PingTimeout);
                return Ok(());
            }
            "307" | "330" => {
                if let Some(nick) = event.params.get(1) {
                    self.identify.accept(nick);
                }
            }
            "318" => {
                if let Some(nick) = event.params.get(1) {
                    if let Some(next) = self.identify.reject(nick) {
                        self.queue.enqueue(format!("WHOIS {next}"));
                    }
                }
            }
            "PRIVMSG" | "ACTION" => {
                if let Some(target) = event.params.first() {
                    if target.starts_with('#') {
                        self.history.record(
                            target,
                            &event.command,
                            &event.sender,
                            &event.params,
                            &event.trailing,
                        );
                    }
                }
            }
            _ => {}
        }

        // Interception augments dispatch: the numerics above still
        // reach any bound handler. PONG (consumed above) does not.
        let handle = SessionHandle {
            ops: self.ops_tx.clone(),
        };
        self.binds.dispatch(&handle, &event);
        Ok(())
    }

    async fn on_duty(
        &mut self,
        transport: &mut Transport,
        sched: &mut Scheduler,
        duty: Duty,
    ) -> Result<()> {
        match duty {
            Duty::Ping => {
                self.ping_serial += 1;
                let token = format!("keepalive-{}", self.ping_serial);
                self.send_now(transport, format!("PING {token}")).await?;
                self.awaiting_pong = true;
                sched.schedule_in(
                    self.config.ping_timeout(),
                    PRIORITY_TIMEOUT,
                    Duty::PingTimeout,
                );
                sched.schedule_in(
                    self.config.ping_interval(),
                    PRIORITY_KEEPALIVE,
                    Duty::Ping,
                );
                Ok(())
            }
            Duty::PingTimeout => {
                if self.awaiting_pong {
                    Err(SessionError::PingTimeout(self.config.ping_timeout()))
                } else {
                    Ok(())
                }
            }
            Duty::ConnectTimeout => {
                if self.state == ConnectionState::Connected {
                    Ok(())
                } else {
                    Err(SessionError::ConnectTimeout(self.config.connect_timeout()))
                }
            }
            Duty::DrainQueue => {
                if let Some(line) = self.queue.pop_next() {
                    self.send_now(transport, line).await?;
                }
                sched.schedule_in(self.config.send_spacing(), PRIORITY_DRAIN, Duty::DrainQueue);
                Ok(())
            }
        }
    }

    async fn on_op(&mut self, transport: &mut Transport, op: Op) -> ControlFlow<()> {
        match op {
            Op::Raw(line) => self.queue.enqueue(line),
            Op::Say { recipient, text } => {
                if self.config.log_own_messages {
                    let nick = self.config.nick.clone();
                    self.history.record(
                        &recipient,
                        "PRIVMSG",
                        &nick,
                        std::slice::from_ref(&recipient),
                        &text,
                    );
                }
                self.queue.enqueue(format!("PRIVMSG {recipient} :{text}"));
            }
            Op::Join(channel) => {
                self.history.join(&channel, self.config.log_capacity);
                self.queue.enqueue(format!("JOIN {channel}"));
            }
            Op::Identify { nick, tx } => {
                // WHOIS is only meaningful on a registered session; a
                // request arriving earlier waits for the welcome, which
                // arms the queue via restart().
                if self.state == ConnectionState::Connected {
                    if let Some(target) = self.identify.push(nick, tx) {
                        self.queue.enqueue(format!("WHOIS {target}"));
                    }
                } else {
                    self.identify.defer(nick, tx);
                }
            }
            Op::Debugging(on) => self.debug_lines = on,
            Op::Disconnect { quit } => {
                self.state = ConnectionState::Closing;
                if let Err(e) = self.send_now(transport, format!("QUIT :{quit}")).await {
                    debug!("QUIT not delivered: {}", e);
                }
                return ControlFlow::Break(());
            }
            Op::Reconnect => {
                self.state = ConnectionState::Closing;
                if let Err(e) = self
                    .send_now(transport, "QUIT :Reconnecting".to_string())
                    .await
                {
                    debug!("QUIT not delivered: {}", e);
                }
                return ControlFlow::Break(());
            }
            Op::Stop => {
                self.stopping = true;
                self.state = ConnectionState::Closing;
                return ControlFlow::Break(());
            }
        }
        ControlFlow::Continue(())
    }

    async fn send_now(&mut self, transport: &mut Transport, line: String) -> Result<()> {
        if self.debug_lines {
            trace!("-> {}", line);
        }
        transport.write_line(line).await
    }

    /// Pause between connections, still answering host commands:
    /// stop and debugging are honored, identify requests are queued
    /// for the next session, everything else is dropped.
    async fn backoff(&mut self) {
        let delay = self.config.reconnect_delay();
        debug!("pausing {:?} before reconnecting", delay);
        let deadline = Instant::now() + delay;

        loop {
            tokio::select! {
                _ = sleep_until(deadline) => return,
                op = self.ops_rx.recv() => match op {
                    Some(Op::Stop) | None => {
                        self.stopping = true;
                        return;
                    }
                    Some(Op::Reconnect) => return,
                    Some(Op::Debugging(on)) => self.debug_lines = on,
                    Some(Op::Identify { nick, tx }) => self.identify.defer(nick, tx),
                    Some(op) => debug!(?op, "not connected; dropping command"),
                },
            }
        }
    }
}
