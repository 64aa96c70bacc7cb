use futures_util::future::BoxFuture;
use futures_util::{FutureExt, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite;

/// Errors raised by the channel transport.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    #[error("websocket error: {0}")]
    Ws(#[from] tungstenite::Error),
    #[error("channel closed")]
    Closed,
}

/// One live bidirectional channel to a meeting session, carrying JSON text
/// frames in both directions.
pub trait Transport: Send {
    fn send(&mut self, frame: String) -> BoxFuture<'_, Result<(), TransportError>>;

    /// Next inbound text frame. `None` means the peer closed the channel.
    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, TransportError>>>;

    fn close(&mut self) -> BoxFuture<'_, ()>;
}

/// Produces a fresh [`Transport`] per connection attempt. Reconnecting always
/// goes through the connector; a transport is never reused.
pub trait Connector: Send + 'static {
    fn connect(&mut self) -> BoxFuture<'_, Result<Box<dyn Transport>, TransportError>>;
}

type WsStream =
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>;

pub struct WsTransport {
    inner: WsStream,
}

impl Transport for WsTransport {
    fn send(&mut self, frame: String) -> BoxFuture<'_, Result<(), TransportError>> {
        async move {
            self.inner
                .send(tungstenite::Message::Text(frame.into()))
                .await
                .map_err(TransportError::from)
        }
        .boxed()
    }

    fn recv(&mut self) -> BoxFuture<'_, Option<Result<String, TransportError>>> {
        async move {
            while let Some(message) = self.inner.next().await {
                match message {
                    Ok(tungstenite::Message::Text(text)) => return Some(Ok(text.into())),
                    Ok(tungstenite::Message::Close(_)) => return None,
                    // ping/pong/binary frames carry no snapshot
                    Ok(_) => continue,
                    Err(err) => return Some(Err(err.into())),
                }
            }
            None
        }
        .boxed()
    }

    fn close(&mut self) -> BoxFuture<'_, ()> {
        async move {
            let _ = self.inner.close(None).await;
        }
        .boxed()
    }
}

/// Dials `<base>/api/meetings/<short_code>/ws`.
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(base_url: &str, short_code: &str) -> Self {
        Self {
            url: format!(
                "{}/api/meetings/{}/ws",
                base_url.trim_end_matches('/'),
                short_code
            ),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Connector for WsConnector {
    fn connect(&mut self) -> BoxFuture<'_, Result<Box<dyn Transport>, TransportError>> {
        async move {
            let (stream, _) = tokio_tungstenite::connect_async(self.url.as_str()).await?;
            log::info!("Channel connected: {}", self.url);
            Ok(Box::new(WsTransport { inner: stream }) as Box<dyn Transport>)
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn it_builds_the_channel_url_from_the_short_code() {
        let connector = WsConnector::new("wss://meet.example.org/", "a1b2");
        assert_eq!(connector.url(), "wss://meet.example.org/api/meetings/a1b2/ws");
    }
}
