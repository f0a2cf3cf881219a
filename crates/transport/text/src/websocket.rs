//! WebSocket transport: one JSON object per text frame, tagged by `op`.

use std::net::SocketAddr;
use std::sync::Arc;

use futures_util::{SinkExt, StreamExt};
use rhizome_burrow_runtime::{BurrowRuntime, Control, OUTBOUND_CAPACITY};
use serde::{Deserialize, Serialize};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

use crate::server::ServerError;
use crate::session::Session;

/// Protocol replies (pong, err) a connection may have waiting.
const REPLY_CAPACITY: usize = 16;

/// Client to server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ClientFrame {
    Input { line: String },
    Ping,
}

/// Server to client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum ServerFrame {
    Output { text: String },
    Pong,
    Err { text: String },
}

impl ServerFrame {
    fn to_message(&self) -> Option<Message> {
        match serde_json::to_string(self) {
            Ok(json) => Some(Message::Text(json.into())),
            Err(err) => {
                error!(error = %err, "failed to encode frame");
                None
            }
        }
    }
}

pub(crate) async fn accept_loop(listener: TcpListener, runtime: Arc<BurrowRuntime>) {
    loop {
        let (stream, addr) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(err) => {
                warn!(error = %err, "websocket accept failed");
                continue;
            }
        };
        let runtime = Arc::clone(&runtime);
        tokio::spawn(async move {
            if let Err(err) = handle_connection(stream, addr, runtime).await {
                error!(%addr, error = %err, "websocket connection error");
            }
        });
    }
}

/// Handle a single WebSocket connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    runtime: Arc<BurrowRuntime>,
) -> Result<(), ServerError> {
    let ws_stream = match tokio_tungstenite::accept_async(stream).await {
        Ok(ws_stream) => ws_stream,
        Err(err) => {
            debug!(%addr, error = %err, "websocket handshake failed");
            return Ok(());
        }
    };
    let (mut ws_sender, mut ws_receiver) = ws_stream.split();
    info!(%addr, "new websocket connection");

    // Game output arrives on `rx`; protocol replies (pong, err) on `reply_rx`.
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);
    let (reply_tx, mut reply_rx) = mpsc::channel::<ServerFrame>(REPLY_CAPACITY);

    let mut session = match Session::open(runtime, addr, tx) {
        Ok(session) => session,
        Err(err) => {
            let frame = ServerFrame::Err {
                text: err.to_string(),
            };
            if let Some(msg) = frame.to_message() {
                let _ = ws_sender.send(msg).await;
            }
            let _ = ws_sender.close().await;
            return Err(err.into());
        }
    };

    // Ends once game output is closed, after draining what was queued.
    let mut sender_task = tokio::spawn(async move {
        loop {
            let frame = tokio::select! {
                text = rx.recv() => match text {
                    Some(text) => ServerFrame::Output { text },
                    None => break,
                },
                Some(frame) = reply_rx.recv() => frame,
            };
            let Some(msg) = frame.to_message() else {
                continue;
            };
            if let Err(err) = ws_sender.send(msg).await {
                debug!(%addr, error = %err, "websocket send failed");
                break;
            }
        }
        let _ = ws_sender.close().await;
    });

    let mut writer_done = false;
    loop {
        let msg = tokio::select! {
            msg = ws_receiver.next() => msg,
            _ = &mut sender_task => {
                info!(%addr, "output closed, ending websocket session");
                writer_done = true;
                break;
            }
        };
        let Some(msg) = msg else {
            break;
        };
        match msg {
            Ok(Message::Text(text)) => {
                if handle_frame(&mut session, &reply_tx, text.as_str()) == Control::Quit {
                    break;
                }
            }
            Ok(Message::Close(_)) => {
                info!(%addr, "websocket client disconnected");
                break;
            }
            // Pong is sent automatically by tungstenite
            Ok(_) => {}
            Err(err) => {
                warn!(%addr, error = %err, "websocket error");
                break;
            }
        }
    }

    // Cleanup
    drop(session);
    drop(reply_tx);
    if !writer_done {
        let _ = sender_task.await;
    }
    info!(%addr, "websocket connection closed");
    Ok(())
}

/// Act on one text frame from the client.
fn handle_frame(session: &mut Session, replies: &mpsc::Sender<ServerFrame>, text: &str) -> Control {
    let reply = match serde_json::from_str::<ClientFrame>(text) {
        Ok(ClientFrame::Input { line }) => return session.handle_line(&line),
        Ok(ClientFrame::Ping) => ServerFrame::Pong,
        Err(err) => {
            debug!(session = %session.id, error = %err, "bad frame");
            ServerFrame::Err {
                text: "bad json".to_string(),
            }
        }
    };
    if replies.try_send(reply).is_err() {
        warn!(session = %session.id, "reply queue full, dropping reply");
    }
    Control::Continue
}
