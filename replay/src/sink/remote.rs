use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use chrono::Utc;
use common::{ParticipantUpdate, WSMessage};
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::task::JoinHandle;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, warn};
use url::Url;

use super::ParticipantSink;

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Sends every update to a tracking server over a websocket.
pub struct RemoteSink {
    url: Url,
    writer: SplitSink<WsStream, Message>,
    reader: JoinHandle<usize>,
    sent: usize,
}

impl RemoteSink {
    pub async fn connect(raw_url: &str) -> Result<Self> {
        let url = websocket_url(raw_url)?;
        let (ws_stream, _) = connect_async(url.as_str())
            .await
            .with_context(|| format!("Failed to connect to websocket {}", url))?;
        info!("Connected to {}", url);

        let (writer, reader) = ws_stream.split();
        let reader = tokio::spawn(log_server_messages(reader));
        Ok(Self {
            url,
            writer,
            reader,
            sent: 0,
        })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    async fn send_ws(&mut self, msg: WSMessage) -> Result<()> {
        let payload = serde_json::to_string(&msg)?;
        self.writer
            .send(Message::Text(payload.into()))
            .await
            .with_context(|| format!("Failed to send to {}", self.url))?;
        Ok(())
    }
}

#[async_trait]
impl ParticipantSink for RemoteSink {
    async fn deliver(&mut self, update: &ParticipantUpdate) -> Result<()> {
        // The server judges freshness by its own clock
        let mut live = update.clone();
        live.timestamp = Utc::now();
        self.send_ws(WSMessage::ParticipantUpdate(live)).await?;
        self.sent += 1;
        Ok(())
    }

    async fn finish(&mut self) -> Result<()> {
        if let Err(e) = self.writer.send(Message::Close(None)).await {
            warn!("Failed to close websocket to {}: {}", self.url, e);
        }
        self.reader.abort();
        info!("Sent {} update(s) to {}", self.sent, self.url);
        Ok(())
    }
}

async fn log_server_messages(mut reader: SplitStream<WsStream>) -> usize {
    let mut received = 0;
    while let Some(msg) = reader.next().await {
        match msg {
            Ok(Message::Text(text)) => {
                received += 1;
                match serde_json::from_str::<WSMessage>(&text) {
                    Ok(WSMessage::Shutdown) => {
                        warn!("Server announced shutdown");
                        break;
                    }
                    Ok(ws_msg) => debug!("Server message: {:?}", ws_msg),
                    Err(_) => debug!("Unparsed server message: {}", text),
                }
            }
            Ok(Message::Close(_)) => break,
            Ok(_) => {}
            Err(e) => {
                warn!("Websocket read failed: {}", e);
                break;
            }
        }
    }
    received
}

/// Turns `host:port`, `http://` or `https://` into a websocket URL.
pub fn websocket_url(raw: &str) -> Result<Url> {
    let mut url = match Url::parse(raw) {
        Ok(url) if url.has_host() => url,
        _ => Url::parse(&format!("ws://{raw}")).context("Invalid server URL")?,
    };
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        "http" | "ws" => "ws",
        other => return Err(anyhow!("Unsupported URL scheme '{}'", other)),
    };
    url.set_scheme(scheme)
        .map_err(|_| anyhow!("Failed to set websocket scheme"))?;
    Ok(url)
}
