//! Echo bot demo
//!
//! Connects to an IRC server, joins a channel, and answers a couple of
//! commands. Shows the typical wiring: config, binds, handle, run.
//!
//! Run with: `cargo run --example echo_bot -- irc.libera.chat 6667 "#slirc-test"`

use anyhow::Result;
use tracing_subscriber::EnvFilter;

use slirc_session::{Config, Session};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info".into()))
        .init();

    let mut args = std::env::args().skip(1);
    let network = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = args.next().as_deref().unwrap_or("6667").parse()?;
    let channel = args.next().unwrap_or_else(|| "#slirc-test".to_string());

    let config = Config {
        network,
        port,
        nick: "slirc-echo".to_string(),
        realname: "slirc-session echo bot".to_string(),
        ..Config::default()
    };

    let mut session = Session::new(config)?;

    session.bind("PRIVMSG", |handle, event| {
        let Some(target) = event.params.first() else {
            return;
        };
        match event.trailing.as_str() {
            "!ping" => handle.say(target, "pong"),
            text if text.starts_with("!echo ") => {
                handle.say(target, text.trim_start_matches("!echo "));
            }
            _ => {}
        }
    });

    session.bind("ACTION", |handle, event| {
        if let Some(target) = event.params.first() {
            if event.trailing.contains("waves") {
                handle.say(target, format!("waves back at {}", event.sender));
            }
        }
    });

    let handle = session.handle();
    handle.joinchan(&channel);

    session.run().await?;
    Ok(())
}
