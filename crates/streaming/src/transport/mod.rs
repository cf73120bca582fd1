//! TCP transport binding
//!
//! 一条 TCP 连接 = 一次调用。不是 RPC 框架，只提供 pump 需要的两样东西：
//! 一个会在对端断开时失败的 writer，以及一个对端 EOF 时触发的取消信号。
//!
//! ```text
//! client                                server
//!   │ {"method":"stream","channel":"imu","queue_size":10}\n
//!   │ ─────────────────────────────────▶ │ validate + attach
//!   │ ◀───────────────── [len][Status]   │
//!   │ ◀───────────────── [len][WireMessage] ...
//!   │ close ───────────────────────────▶ │ EOF ─▶ cancel ─▶ detach
//! ```
//!
//! Frames are a u32 big-endian length followed by the payload, encoded with
//! bincode or JSON ([`contracts::WireFormat`]).

mod client;
mod frame;
mod server;

pub use client::{RemoteStream, TcpClient};
pub use frame::{
    decode_payload, encode_payload, read_frame, write_frame, CallMethod, CallRequest,
    MAX_FRAME_LEN,
};
pub use server::{FrameWriter, TcpTransport};
