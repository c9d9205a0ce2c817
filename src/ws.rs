//! Runtime-selected websocket transport, split across `async-std` and
//! `tokio` the same way the rest of this crate's runtime layer is.

use async_tungstenite::tungstenite::protocol::WebSocketConfig;
use async_tungstenite::tungstenite::Message as WsMessage;
use futures::{SinkExt, StreamExt};

use crate::error::Result;

/// Largest single incoming frame the socket will accept before the read
/// errors out. `tungstenite` never sends automatic pings, so there is no
/// idle-ping timeout to configure alongside it; the browser side is
/// expected to keep the connection alive by virtue of ongoing protocol
/// traffic.
const MAX_FRAME_SIZE: usize = 256 * 1024 * 1024;

fn socket_config() -> WebSocketConfig {
    WebSocketConfig {
        max_frame_size: Some(MAX_FRAME_SIZE),
        ..Default::default()
    }
}

cfg_if::cfg_if! {
    if #[cfg(feature = "async-std-runtime")] {
        pub type WsStream =
            async_tungstenite::WebSocketStream<async_tungstenite::async_std::ConnectStream>;

        pub async fn connect(url: &str) -> Result<WsStream> {
            let (ws, _) =
                async_tungstenite::async_std::connect_async_with_config(url, Some(socket_config()))
                    .await?;
            Ok(ws)
        }
    } else if #[cfg(feature = "tokio-runtime")] {
        pub type WsStream =
            async_tungstenite::WebSocketStream<async_tungstenite::tokio::ConnectStream>;

        pub async fn connect(url: &str) -> Result<WsStream> {
            let (ws, _) =
                async_tungstenite::tokio::connect_async_with_config(url, Some(socket_config()))
                    .await?;
            Ok(ws)
        }
    } else {
        compile_error!("either `async-std-runtime` or `tokio-runtime` must be enabled");
    }
}

pub type WsSink = futures::stream::SplitSink<WsStream, WsMessage>;
pub type WsSource = futures::stream::SplitStream<WsStream>;

pub fn split(ws: WsStream) -> (WsSink, WsSource) {
    ws.split()
}

pub async fn send_text(sink: &mut WsSink, text: String) -> Result<()> {
    sink.send(WsMessage::text(text)).await?;
    Ok(())
}
