//! Network transports for Burrow.
//!
//! Plain-text clients speak newline-terminated lines over TCP. WebSocket
//! clients exchange JSON frames carrying the same lines.

pub mod line;
pub mod server;
pub mod session;
pub mod websocket;

pub use line::LineReader;
pub use server::{Server, ServerConfig, ServerError};
pub use session::{Session, SessionId};
pub use websocket::{ClientFrame, ServerFrame};
