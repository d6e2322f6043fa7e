//! 链路层错误类型定义

use crate::state::ConnectionState;
use pidtune_protocol::ProtocolError;
use pidtune_serial::TransportError;
use thiserror::Error;

/// 链路层错误类型
#[derive(Error, Debug)]
pub enum LinkError {
    /// 传输层错误（写入失败等）
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// 命令编码错误
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// 打开传输失败（致命，连接状态回到 Disconnected）
    #[error("Connection failed: {0}")]
    Open(TransportError),

    /// 会话不处于 Disconnected 状态
    #[error("Cannot connect while {0:?}")]
    AlreadyConnected(ConnectionState),

    /// 后台线程启动失败
    #[error("Failed to spawn reader thread: {0}")]
    Spawn(std::io::Error),
}
