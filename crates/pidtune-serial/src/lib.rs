//! # PID Tune Transport Layer
//!
//! 字节流传输抽象层：上层只依赖 [`Transport`] / [`TransportReader`] /
//! [`TransportWriter`] 三个 trait，不关心底层是串口还是内存 Mock。
//!
//! 传输句柄由宿主环境打开，`split()` 之后读端交给后台读取线程、写端留在
//! 命令编码器中，二者可以并发使用。

use thiserror::Error;

#[cfg(feature = "serial")]
pub mod serial;

#[cfg(feature = "serial")]
pub use serial::{SerialConfig, SerialReader, SerialTransport, SerialWriter};

#[cfg(any(test, feature = "mock"))]
pub mod mock;

#[cfg(any(test, feature = "mock"))]
pub use mock::{MockReader, MockTransport, MockWriter};

/// 传输层统一错误类型
#[derive(Error, Debug)]
pub enum TransportError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "serial")]
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// 打开端口失败（致命，不会启动后台线程）
    #[error("Failed to open {port}: {reason}")]
    Open { port: String, reason: String },

    /// 句柄已关闭
    #[error("Transport closed")]
    Closed,
}

/// 读端：非阻塞（或短超时）读取
pub trait TransportReader: Send {
    /// 读取当前可用的字节
    ///
    /// 没有数据时返回 `Ok(0)`，不能长时间阻塞，否则停止信号无法及时生效。
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError>;
}

/// 写端：尽力而为的写入
pub trait TransportWriter: Send {
    /// 写入完整的字节序列
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError>;

    /// 关闭写端（释放底层句柄）
    fn close(&mut self) -> Result<(), TransportError> {
        Ok(())
    }
}

/// 已打开的传输句柄
pub trait Transport {
    type Reader: TransportReader + 'static;
    type Writer: TransportWriter + 'static;

    /// 分离为读端和写端
    fn split(self) -> Result<(Self::Reader, Self::Writer), TransportError>;
}
