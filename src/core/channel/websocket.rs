use async_trait::async_trait;
use futures_util::{future, SinkExt, StreamExt};
use tokio_tungstenite::tungstenite::Message;

use super::{ChannelError, Connection, Transport};
use crate::core::session::SessionId;
use crate::utils::url::session_channel_url;

/// Connects session channels to the backend's `/ws` endpoint.
pub struct WebSocketTransport {
    base_url: String,
}

impl WebSocketTransport {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn connect(&self, session_id: SessionId) -> Result<Connection, ChannelError> {
        let url = session_channel_url(&self.base_url, session_id);
        let (ws_stream, _) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(|err| ChannelError::Connect(err.to_string()))?;
        let (ws_write, ws_read) = ws_stream.split();

        let sink = ws_write
            .sink_map_err(|err| ChannelError::Send(err.to_string()))
            .with(|text: String| future::ready(Ok::<_, ChannelError>(Message::Text(text.into()))));

        let stream = ws_read.filter_map(|message| {
            future::ready(match message {
                Ok(Message::Text(text)) => Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => Some(
                    String::from_utf8(bytes.to_vec())
                        .map_err(|err| ChannelError::Receive(err.to_string())),
                ),
                Ok(Message::Close(_)) => Some(Err(ChannelError::Closed)),
                Ok(_) => None,
                Err(err) => Some(Err(ChannelError::Receive(err.to_string()))),
            })
        });

        Ok(Connection {
            sink: Box::pin(sink),
            stream: Box::pin(stream),
        })
    }
}
