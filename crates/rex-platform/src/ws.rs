//! Inbound command stream over a WebSocket (spec §4.9 `commands()`),
//! generalizing the teacher's `tokio-tungstenite` dependency (there used
//! for the Alpaca paper trading feed) to the platform's command channel.

use std::time::Duration;

use futures_util::StreamExt;
use tokio::sync::mpsc::UnboundedSender;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::Message;

use rex_schemas::Command;

const RECONNECT_DELAY: Duration = Duration::from_secs(5);

/// Runs forever, reconnecting on any transport error. Intended to be
/// `tokio::spawn`ed once per [`crate::RestPlatformLink`].
pub async fn run_command_stream(url: String, api_key: String, tx: UnboundedSender<Command>) {
    loop {
        match connect(&url, &api_key).await {
            Ok(mut stream) => {
                while let Some(msg) = stream.next().await {
                    match msg {
                        Ok(Message::Text(text)) => match serde_json::from_str::<Command>(&text) {
                            Ok(cmd) => {
                                if tx.send(cmd).is_err() {
                                    // Receiver dropped: PlatformLink is gone, nothing left to do.
                                    return;
                                }
                            }
                            Err(e) => {
                                tracing::warn!(error = %e, "discarding malformed command frame");
                            }
                        },
                        Ok(Message::Close(_)) => break,
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, "command stream error, reconnecting");
                            break;
                        }
                    }
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "command stream connect failed, retrying");
            }
        }
        tokio::time::sleep(RECONNECT_DELAY).await;
    }
}

async fn connect(
    url: &str,
    api_key: &str,
) -> anyhow::Result<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
> {
    let mut request = url.into_client_request()?;
    request
        .headers_mut()
        .insert("Authorization", format!("Bearer {api_key}").parse()?);
    let (stream, _response) = tokio_tungstenite::connect_async(request).await?;
    Ok(stream)
}
