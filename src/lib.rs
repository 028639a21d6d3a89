//! # slirc-session
//!
//! A resilient IRC client session engine. The engine owns the socket,
//! the CRLF framing, the keepalive cadence, the flood-control pacing,
//! and the reconnection policy; the host registers per-command handlers
//! and issues commands through a cloneable handle.
//!
//! ## Features
//!
//! - Line framing that is independent of read chunk boundaries
//! - Lenient line parsing into structured events
//! - Flood control: queued sends paced at a configurable spacing
//! - Keepalive PING with forced close on a missed PONG
//! - Automatic reconnect with backoff after any transport failure
//! - Single-flight WHOIS identity verification with queued requests
//! - Bounded per-channel message history
//! - Optional TLS via rustls

#![deny(clippy::all)]
#![cfg_attr(docsrs, feature(doc_cfg))]

//! ## Quick Start
//!
//! ```rust,no_run
//! use slirc_session::{Config, Session};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), slirc_session::SessionError> {
//!     let config = Config {
//!         network: "irc.libera.chat".to_string(),
//!         port: 6667,
//!         nick: "examplebot".to_string(),
//!         ..Config::default()
//!     };
//!
//!     let mut session = Session::new(config)?;
//!     session.bind("PRIVMSG", |handle, event| {
//!         if event.trailing == "!ping" {
//!             handle.say(&event.params[0], "pong");
//!         }
//!     });
//!
//!     let handle = session.handle();
//!     handle.joinchan("#example");
//!
//!     session.run().await
//! }
//! ```

pub mod codec;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod event;
pub mod history;
pub mod identify;
pub mod prefix;
pub mod queue;
pub mod schedule;
pub mod session;
pub mod transport;

pub use self::codec::{LineCodec, MAX_LINE_LEN};
pub use self::config::{Config, IpVersion};
pub use self::dispatch::{Binds, Handler};
pub use self::error::{ConfigError, Result, SessionError};
pub use self::event::Event;
pub use self::history::{ChannelHistory, ChannelLog, LogEntry};
pub use self::identify::{IdentifyQueue, IdentifyVerdict};
pub use self::prefix::Source;
pub use self::queue::OutputQueue;
pub use self::schedule::{Duty, Scheduler};
pub use self::session::{ConnectionState, Session, SessionHandle};
pub use self::transport::Transport;
