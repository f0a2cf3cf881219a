//! TCP listeners and the plain-text connection loop.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;

use rhizome_burrow_runtime::{BurrowRuntime, Control, OUTBOUND_CAPACITY, RuntimeError};
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::line::{DEFAULT_MAX_LINE_LEN, LineReader};
use crate::session::Session;
use crate::websocket;

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    /// Plain-text port.
    pub port: u16,
    /// WebSocket JSON port, if that listener is wanted.
    pub ws_port: Option<u16>,
    /// Longest accepted input line in bytes.
    pub max_line_len: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 4000,
            ws_port: None,
            max_line_len: DEFAULT_MAX_LINE_LEN,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] io::Error),

    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),
}

/// The Burrow server: a plain-text listener and an optional WebSocket one,
/// both driving the same runtime.
pub struct Server {
    config: ServerConfig,
    runtime: Arc<BurrowRuntime>,
    text: TcpListener,
    ws: Option<TcpListener>,
}

impl Server {
    /// Bind every configured listener. Port 0 picks a free port; see
    /// [`Server::local_addr`].
    pub async fn bind(
        runtime: Arc<BurrowRuntime>,
        config: ServerConfig,
    ) -> Result<Self, ServerError> {
        let text = bind_listener(&config.host, config.port).await?;
        let ws = match config.ws_port {
            Some(port) => Some(bind_listener(&config.host, port).await?),
            None => None,
        };
        Ok(Self {
            config,
            runtime,
            text,
            ws,
        })
    }

    /// Get the runtime.
    pub fn runtime(&self) -> &Arc<BurrowRuntime> {
        &self.runtime
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Address of the plain-text listener.
    pub fn local_addr(&self) -> Result<SocketAddr, ServerError> {
        Ok(self.text.local_addr()?)
    }

    /// Address of the WebSocket listener, if one was configured.
    pub fn ws_local_addr(&self) -> Result<Option<SocketAddr>, ServerError> {
        self.ws
            .as_ref()
            .map(|listener| listener.local_addr())
            .transpose()
            .map_err(ServerError::from)
    }

    /// Accept connections until the task is cancelled.
    pub async fn run(self) -> Result<(), ServerError> {
        let Self {
            config,
            runtime,
            text,
            ws,
        } = self;
        info!(addr = %text.local_addr()?, "listening for text clients");

        if let Some(listener) = ws {
            info!(addr = %listener.local_addr()?, "listening for websocket clients");
            tokio::spawn(websocket::accept_loop(listener, Arc::clone(&runtime)));
        }

        loop {
            let (stream, addr) = match text.accept().await {
                Ok(accepted) => accepted,
                Err(err) => {
                    warn!(error = %err, "accept failed");
                    continue;
                }
            };
            let runtime = Arc::clone(&runtime);
            let max_line_len = config.max_line_len;
            tokio::spawn(async move {
                if let Err(err) = handle_connection(stream, addr, runtime, max_line_len).await {
                    error!(%addr, error = %err, "connection error");
                }
            });
        }
    }
}

async fn bind_listener(host: &str, port: u16) -> Result<TcpListener, ServerError> {
    let addr = format!("{host}:{port}");
    TcpListener::bind(&addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })
}

/// Handle a single plain-text connection.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    runtime: Arc<BurrowRuntime>,
    max_line_len: usize,
) -> Result<(), ServerError> {
    info!(%addr, "new text connection");
    let (reader, mut writer) = stream.into_split();
    let (tx, mut rx) = mpsc::channel::<String>(OUTBOUND_CAPACITY);

    let mut session = match Session::open(runtime, addr, tx) {
        Ok(session) => session,
        Err(err) => {
            let _ = writer.write_all(b"The world is not ready for visitors.\n").await;
            let _ = writer.shutdown().await;
            return Err(err.into());
        }
    };

    // Runs until every sender is gone, so it drains what was queued before
    // the player was removed or cut off.
    let mut sender_task = tokio::spawn(async move {
        while let Some(text) = rx.recv().await {
            if let Err(err) = writer.write_all(text.as_bytes()).await {
                debug!(%addr, error = %err, "write failed");
                break;
            }
        }
        let _ = writer.shutdown().await;
    });

    let mut lines = LineReader::new(reader).max_line_len(max_line_len);
    let mut writer_done = false;
    loop {
        tokio::select! {
            read = lines.read_line() => match read {
                Ok(Some(line)) => {
                    if session.handle_line(&line) == Control::Quit {
                        break;
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!(%addr, error = %err, "read failed");
                    break;
                }
            },
            _ = &mut sender_task => {
                info!(%addr, "output closed, ending session");
                writer_done = true;
                break;
            }
        }
    }

    // Cleanup
    drop(session);
    if !writer_done {
        let _ = sender_task.await;
    }
    info!(%addr, "connection closed");
    Ok(())
}
