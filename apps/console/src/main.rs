//! tcplink terminal messenger.

mod cli;

use anyhow::{Context, bail};
use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

use tcplink_client::{ClientConfig, ConnectionManager, EnvelopeKind, LinkEvent, TextCodec};
use tcplink_settings::{ConnectionSettings, JsonFileStore, SettingsStore};

use crate::cli::Args;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Logs go to stderr so stdout carries only the conversation.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "starting tcplink");

    run(Args::parse()).await
}

async fn run(args: Args) -> anyhow::Result<()> {
    let store = match &args.settings {
        Some(path) => JsonFileStore::new(path.clone()),
        None => JsonFileStore::at_default_path().context("locating settings file")?,
    };

    let mut settings = match store.load() {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "failed to load settings, using defaults");
            ConnectionSettings::default()
        }
    };
    apply_overrides(&mut settings, &args)?;
    if !settings.is_complete() {
        bail!("no server address saved; pass --host and --port");
    }

    let codec = TextCodec::for_label(&settings.encoding)
        .with_context(|| format!("unsupported encoding {:?}", settings.encoding))?;
    let manager = ConnectionManager::new(ClientConfig {
        codec,
        ..ClientConfig::default()
    });
    let port = u32::from(settings.port);

    if !args.skip_probe {
        let result = manager.probe(&settings.host, port).await;
        if result.is_error() {
            bail!("{}", result.text);
        }
        println!("{}", result.text);
        if let Err(e) = store.save(&settings) {
            tracing::warn!(error = %e, path = ?store.path(), "failed to save settings");
        }
    }

    let (_, mut events) = manager.events().subscribe_channel();
    let json = args.json;
    let printer = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            println!("{}", render(&event, json));
        }
    });

    manager.start(&settings.host, port).await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line.context("reading stdin")? {
                Some(line) if line.trim().is_empty() => {}
                Some(line) => {
                    // Failures are already reported through the event stream.
                    let _ = manager.send(&line).await;
                }
                None => break,
            },
        }
    }

    manager.stop().await;
    drop(manager);
    printer.await.context("event printer failed")?;
    Ok(())
}

/// Layers command-line values over the saved settings.
fn apply_overrides(settings: &mut ConnectionSettings, args: &Args) -> anyhow::Result<()> {
    if let Some(host) = &args.host {
        settings.host = host.trim().to_string();
    }
    if let Some(port) = args.port {
        settings.port = u16::try_from(port)
            .ok()
            .filter(|p| *p != 0)
            .with_context(|| format!("port {port} is outside 1-65535"))?;
    }
    if let Some(encoding) = &args.encoding {
        settings.encoding = encoding.clone();
    }
    Ok(())
}

fn render(event: &LinkEvent, json: bool) -> String {
    match (event, json) {
        (LinkEvent::StatusChanged(connected), true) => {
            serde_json::json!({ "event": "status", "connected": connected }).to_string()
        }
        (LinkEvent::Message(envelope), true) => {
            serde_json::json!({ "event": "message", "envelope": envelope }).to_string()
        }
        (LinkEvent::StatusChanged(true), false) => "connection status: connected".into(),
        (LinkEvent::StatusChanged(false), false) => "connection status: disconnected".into(),
        (LinkEvent::Message(envelope), false) => match envelope.kind {
            EnvelopeKind::Message => format!("server: {}", envelope.text),
            EnvelopeKind::Error => format!("error: {}", envelope.text),
        },
    }
}
