//! Production connector: WebSocket first, HTTP streaming as fallback.
//!
//! [`WsConnector`] dials the fixed connect path over WebSocket and, when the
//! handshake fails (proxies and captive networks that eat upgrade requests),
//! falls back to a chunked HTTP downlink plus one POST per outbound frame.
//! Either way the session sees the same [`Connection`] handle; transport
//! selection never leaks upward.

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;

use spotline_proto::{CONNECT_PATH, ClientFrame, ServerFrame};

use crate::connector::{ConnectError, Connection, Connector};

/// Connector with WebSocket primary and HTTP-streaming fallback paths.
#[derive(Debug, Clone, Default)]
pub struct WsConnector {
    http: reqwest::Client,
}

impl WsConnector {
    /// Connector with a fresh HTTP client for the fallback path.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    async fn connect_ws(&self, base_url: &str) -> Result<Connection, ConnectError> {
        let url = ws_url(base_url)?;
        let (stream, _response) = tokio_tungstenite::connect_async(url.as_str())
            .await
            .map_err(connect_err)?;
        let (mut sink, mut source) = stream.split();

        let (to_server, mut outbound) = mpsc::channel::<ClientFrame>(32);
        let (inbound, from_server) = mpsc::channel::<ServerFrame>(32);

        let pump = tokio::spawn(async move {
            loop {
                tokio::select! {
                    frame = outbound.recv() => match frame {
                        Some(frame) => match frame.encode() {
                            Ok(text) => {
                                if sink.send(Message::Text(text)).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => tracing::warn!("dropping unencodable frame: {err}"),
                        },
                        None => {
                            let _ = sink.send(Message::Close(None)).await;
                            break;
                        }
                    },
                    message = source.next() => match message {
                        Some(Ok(Message::Text(text))) => match ServerFrame::decode(&text) {
                            Ok(frame) => {
                                if inbound.send(frame).await.is_err() {
                                    break;
                                }
                            }
                            Err(err) => tracing::warn!("dropping undecodable frame: {err}"),
                        },
                        Some(Ok(Message::Close(_))) | None => break,
                        // Pings and pongs are answered by the protocol layer.
                        Some(Ok(_)) => {}
                        Some(Err(err)) => {
                            tracing::warn!("websocket stream failed: {err}");
                            break;
                        }
                    },
                }
            }
        });

        Ok(Connection::new(to_server, from_server, Some(pump.abort_handle())))
    }

    async fn connect_stream(&self, base_url: &str) -> Result<Connection, ConnectError> {
        let down_url = http_url(base_url, "stream")?;
        let up_url = http_url(base_url, "send")?;

        let response = self
            .http
            .get(down_url)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(connect_err)?;

        let (to_server, mut outbound) = mpsc::channel::<ClientFrame>(32);
        let (inbound, from_server) = mpsc::channel::<ServerFrame>(32);
        let client = self.http.clone();

        let pump = tokio::spawn(async move {
            let mut chunks = response.bytes_stream();
            let mut buffer: Vec<u8> = Vec::new();
            loop {
                tokio::select! {
                    frame = outbound.recv() => match frame {
                        Some(frame) => match frame.encode() {
                            Ok(text) => {
                                let post = client
                                    .post(up_url.clone())
                                    .header(reqwest::header::CONTENT_TYPE, "application/json")
                                    .body(text)
                                    .send()
                                    .await;
                                if let Err(err) = post {
                                    tracing::warn!("http uplink failed: {err}");
                                    break;
                                }
                            }
                            Err(err) => tracing::warn!("dropping unencodable frame: {err}"),
                        },
                        None => break,
                    },
                    chunk = chunks.next() => match chunk {
                        Some(Ok(bytes)) => {
                            buffer.extend_from_slice(&bytes);
                            if !drain_lines(&mut buffer, &inbound).await {
                                break;
                            }
                        }
                        Some(Err(err)) => {
                            tracing::warn!("http downlink failed: {err}");
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        Ok(Connection::new(to_server, from_server, Some(pump.abort_handle())))
    }
}

impl Connector for WsConnector {
    fn connect(
        &self,
        base_url: &str,
    ) -> impl std::future::Future<Output = Result<Connection, ConnectError>> + Send {
        async move {
            match self.connect_ws(base_url).await {
                Ok(connection) => Ok(connection),
                Err(err) => {
                    tracing::warn!("websocket connect failed: {err}; trying http streaming");
                    self.connect_stream(base_url).await
                }
            }
        }
    }
}

/// Forwards each complete newline-delimited frame in `buffer`. Returns
/// `false` once the session side hung up.
async fn drain_lines(buffer: &mut Vec<u8>, inbound: &mpsc::Sender<ServerFrame>) -> bool {
    while let Some(pos) = buffer.iter().position(|byte| *byte == b'\n') {
        let line: Vec<u8> = buffer.drain(..=pos).collect();
        let Ok(text) = std::str::from_utf8(&line[..line.len() - 1]) else {
            tracing::warn!("dropping non-utf8 line on http downlink");
            continue;
        };
        let text = text.trim_end_matches('\r');
        // Bare newlines keep intermediaries from buffering the stream.
        if text.is_empty() {
            continue;
        }
        match ServerFrame::decode(text) {
            Ok(frame) => {
                if inbound.send(frame).await.is_err() {
                    return false;
                }
            }
            Err(err) => tracing::warn!("dropping undecodable frame: {err}"),
        }
    }
    true
}

fn ws_url(base_url: &str) -> Result<url::Url, ConnectError> {
    let mut url = url::Url::parse(base_url).map_err(connect_err)?;
    let scheme = match url.scheme() {
        "https" | "wss" => "wss",
        _ => "ws",
    };
    url.set_scheme(scheme).map_err(|()| ConnectError::Connect {
        reason: format!("cannot derive a websocket url from {base_url}"),
    })?;
    url.set_path(&format!("{CONNECT_PATH}/websocket"));
    Ok(url)
}

fn http_url(base_url: &str, leg: &str) -> Result<url::Url, ConnectError> {
    let mut url = url::Url::parse(base_url).map_err(connect_err)?;
    url.set_path(&format!("{CONNECT_PATH}/{leg}"));
    Ok(url)
}

fn connect_err(err: impl std::fmt::Display) -> ConnectError {
    ConnectError::Connect {
        reason: err.to_string(),
    }
}
