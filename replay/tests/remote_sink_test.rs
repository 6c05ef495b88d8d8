mod support;

use anyhow::Result;
use common::WSMessage;
use futures_util::StreamExt;
use replay::sink::{ParticipantSink, RemoteSink, websocket_url};
use support::{t0, update_at};
use tokio::net::TcpListener;
use tokio::time::{Duration, timeout};
use tokio_tungstenite::tungstenite::Message;

#[tokio::test]
async fn test_updates_reach_the_server() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(stream).await?;
        let mut received = Vec::new();
        while let Some(msg) = ws.next().await {
            match msg? {
                Message::Text(text) => received.push(serde_json::from_str::<WSMessage>(&text)?),
                Message::Close(_) => break,
                _ => {}
            }
        }
        Ok::<_, anyhow::Error>(received)
    });

    // Bare host:port, as typed on the command line
    let mut sink = RemoteSink::connect(&addr.to_string()).await?;
    sink.deliver(&update_at("a", 100.0, 0)).await?;
    sink.deliver(&update_at("b", 200.0, 60)).await?;
    sink.finish().await?;

    let received = timeout(Duration::from_secs(5), server).await???;
    assert_eq!(received.len(), 2);
    match &received[0] {
        WSMessage::ParticipantUpdate(update) => {
            assert_eq!(update.device_id, "a");
            // Sent with the time of sending, not of recording
            assert!(update.timestamp > t0());
        }
        other => panic!("unexpected message {other:?}"),
    }
    Ok(())
}

#[test]
fn test_websocket_url_normalisation() -> Result<()> {
    assert_eq!(websocket_url("localhost:8081")?.as_str(), "ws://localhost:8081/");
    assert_eq!(websocket_url("127.0.0.1:8081")?.as_str(), "ws://127.0.0.1:8081/");
    assert_eq!(websocket_url("http://example.org/ws")?.as_str(), "ws://example.org/ws");
    assert_eq!(websocket_url("https://example.org")?.as_str(), "wss://example.org/");
    assert_eq!(websocket_url("ws://example.org:8081")?.as_str(), "ws://example.org:8081/");
    assert!(websocket_url("ftp://example.org").is_err());
    Ok(())
}

#[tokio::test]
async fn test_finish_succeeds_after_server_hung_up() -> Result<()> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;

    let server = tokio::spawn(async move {
        let (stream, _) = listener.accept().await?;
        let mut ws = tokio_tungstenite::accept_async(stream).await?;
        ws.close(None).await?;
        Ok::<_, anyhow::Error>(())
    });

    let mut sink = RemoteSink::connect(&format!("ws://{addr}")).await?;
    timeout(Duration::from_secs(5), server).await???;
    tokio::time::sleep(Duration::from_millis(50)).await;

    sink.finish().await?;
    Ok(())
}
