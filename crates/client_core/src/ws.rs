//! Server change notifications pushed over the websocket.

use std::sync::Arc;

use anyhow::{Context as _, Result};
use futures::StreamExt;
use serde::Deserialize;
use serde_json::Value;
use shared::{
    domain::Interface,
    protocol::{Change, Event},
};
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_tungstenite::{connect_async, tungstenite::Message};
use tracing::{debug, info, warn};

use crate::dispatcher::EventSink;

#[derive(Debug, Error)]
pub enum ChangeFeedError {
    #[error("malformed change message: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("unsupported change operation: {0}")]
    UnknownOperation(String),
    #[error("server_url must start with http:// or https://")]
    InvalidServerUrl,
}

#[derive(Debug, Deserialize)]
struct ChangeMessage {
    interface: String,
    operation: String,
    #[serde(default)]
    data: Value,
}

/// Decodes one websocket frame. Messages for interfaces this client does not
/// track decode to `None`.
pub fn parse_change(text: &str) -> Result<Option<Event>, ChangeFeedError> {
    let message: ChangeMessage = serde_json::from_str(text)?;
    let Ok(interface) = message.interface.parse::<Interface>() else {
        debug!(interface = %message.interface, "ignoring change for untracked interface");
        return Ok(None);
    };

    let change = match message.operation.as_str() {
        "insert" => Change::Insert(serde_json::from_value(message.data)?),
        "update" => Change::Update(serde_json::from_value(message.data)?),
        "delete" => Change::Remove(serde_json::from_value(message.data)?),
        other => return Err(ChangeFeedError::UnknownOperation(other.to_string())),
    };

    Ok(Some(Event::Changed { interface, change }))
}

pub fn ws_url(server_url: &str) -> Result<String, ChangeFeedError> {
    let base = if let Some(rest) = server_url.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = server_url.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        return Err(ChangeFeedError::InvalidServerUrl);
    };
    Ok(format!("{}/ws", base.trim_end_matches('/')))
}

/// Connects to the change feed and emits an `Event::Changed` for every
/// tracked notification until the server closes the socket.
pub async fn spawn_change_feed(
    sink: Arc<dyn EventSink>,
    server_url: &str,
) -> Result<JoinHandle<()>> {
    let url = ws_url(server_url)?;
    let (ws_stream, _) = connect_async(&url)
        .await
        .with_context(|| format!("failed to connect websocket: {url}"))?;
    let (_, mut reader) = ws_stream.split();
    info!(%url, "change feed connected");

    Ok(tokio::spawn(async move {
        while let Some(msg) = reader.next().await {
            match msg {
                Ok(Message::Text(text)) => match parse_change(&text) {
                    Ok(Some(event)) => sink.emit(event),
                    Ok(None) => {}
                    Err(err) => warn!(error = %err, "dropping change notification"),
                },
                Ok(Message::Close(_)) => break,
                Ok(_) => {}
                Err(err) => {
                    warn!(error = %err, "change feed receive failed");
                    break;
                }
            }
        }
        info!("change feed closed");
    }))
}
