//! IPC (Inter-Process Communication) module for daemon control
//!
//! JSON-lines requests and replies over a Unix Domain Socket.

pub mod protocol;
mod unix_socket;

pub use protocol::{
    ErrorReply, OkReply, PhotoReply, ReplyStatus, Request, StartReply, StopReply, SubscribeReply,
};
pub use unix_socket::{
    decode_reply, ClientError, EventStream, SocketPath, UnixSocketClient, UnixSocketServer,
};
