//! Connects to a MUD, logs what it says, and maps where you go.
//!
//! ```text
//! mudwalk [host] [port] [map-file] [target-room]
//! ```
//!
//! Type commands on stdin. On disconnect or Ctrl-C the map is saved (if a
//! map file was given) and the route from the last room to `target-room`
//! is printed.

use mudlink::prelude::*;
use tokio::io::{AsyncBufReadExt, BufReader};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mudlink_protocol=warn".into()),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let host = args.next().unwrap_or_else(|| "127.0.0.1".to_string());
    let port: u16 = match args.next() {
        Some(p) => p.parse()?,
        None => 6789,
    };
    let map_file = args.next();
    let target = args.next();

    let mut builder = MudClient::builder().host(&host).port(port);
    if let Some(path) = &map_file {
        builder = builder.map_file(path);
    }
    let mut client = builder.connect().await?;
    tracing::info!(%host, port, rooms = client.map().room_count(), "connected");

    let mut stdin = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            events = client.next_events() => {
                if !report(events?) {
                    break;
                }
            }
            line = stdin.next_line() => match line? {
                Some(command) => client.send(&command).await?,
                None => break,
            },
            _ = tokio::signal::ctrl_c() => break,
        }
    }

    if client.is_connected() {
        client.close().await?;
    }
    if map_file.is_some() {
        let path = client.save_map()?;
        tracing::info!(path = %path.display(), "map saved");
    }

    let stats = client.map().stats();
    println!(
        "{} rooms, {} exits, {} unexplored",
        stats.total_rooms,
        stats.total_edges,
        client.map().unexplored_frontier().len()
    );
    if let Some(target) = target {
        match client.route_to(&target) {
            Ok(Some(route)) if route.is_empty() => println!("already in {target}"),
            Ok(Some(route)) => println!("route to {target}: {route}"),
            Ok(None) => println!("no known route to {target}"),
            Err(e) => println!("cannot route to {target}: {e}"),
        }
    }
    Ok(())
}

/// Logs a batch of events. Returns `false` once the connection is gone.
fn report(events: Vec<ClientEvent>) -> bool {
    for event in events {
        match event {
            ClientEvent::Line(line) => tracing::info!("{line}"),
            ClientEvent::Prompt(prompt) => tracing::info!(prompt = %prompt.trim_end()),
            ClientEvent::Gmcp { message, .. } => {
                tracing::debug!(channel = %message.channel, "gmcp");
            }
            ClientEvent::RoomChanged { room_id, previous } => {
                if previous.as_ref() != Some(&room_id) {
                    tracing::info!(room = %room_id, "moved");
                }
            }
            ClientEvent::Disconnected => return false,
        }
    }
    true
}
