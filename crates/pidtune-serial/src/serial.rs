//! 串口后端（serialport）

use crate::{Transport, TransportError, TransportReader, TransportWriter};
use serde::{Deserialize, Serialize};
use serialport::SerialPort;
use std::io::{ErrorKind, Read, Write};
use std::time::Duration;
use tracing::{debug, info};

/// 串口配置
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SerialConfig {
    /// 端口路径（如 /dev/ttyUSB0、COM3）
    pub port: String,
    /// 波特率
    pub baud_rate: u32,
    /// 单次读取超时（毫秒），保持很短以便读取线程及时响应停止信号
    pub read_timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: "/dev/ttyUSB0".to_string(),
            baud_rate: 115_200,
            read_timeout_ms: 10,
        }
    }
}

/// 已打开的串口
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    name: String,
}

impl SerialTransport {
    /// 打开串口
    ///
    /// # 错误
    /// - `TransportError::Open`: 端口不存在、被占用或无权限
    pub fn open(config: &SerialConfig) -> Result<Self, TransportError> {
        let port = serialport::new(&config.port, config.baud_rate)
            .timeout(Duration::from_millis(config.read_timeout_ms))
            .open()
            .map_err(|e| TransportError::Open {
                port: config.port.clone(),
                reason: e.to_string(),
            })?;

        info!("Opened {} at {} baud", config.port, config.baud_rate);
        Ok(Self {
            port,
            name: config.port.clone(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Transport for SerialTransport {
    type Reader = SerialReader;
    type Writer = SerialWriter;

    fn split(self) -> Result<(SerialReader, SerialWriter), TransportError> {
        let reader_port = self.port.try_clone()?;
        Ok((
            SerialReader { port: reader_port },
            SerialWriter {
                port: Some(self.port),
                name: self.name,
            },
        ))
    }
}

/// 串口读端
pub struct SerialReader {
    port: Box<dyn SerialPort>,
}

impl TransportReader for SerialReader {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        let waiting = self.port.bytes_to_read()? as usize;
        if waiting == 0 || buf.is_empty() {
            return Ok(0);
        }

        let len = waiting.min(buf.len());
        match self.port.read(&mut buf[..len]) {
            Ok(n) => Ok(n),
            Err(e) if e.kind() == ErrorKind::TimedOut || e.kind() == ErrorKind::WouldBlock => {
                Ok(0)
            },
            Err(e) => Err(e.into()),
        }
    }
}

/// 串口写端
pub struct SerialWriter {
    port: Option<Box<dyn SerialPort>>,
    name: String,
}

impl TransportWriter for SerialWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        let port = self.port.as_mut().ok_or(TransportError::Closed)?;
        port.write_all(bytes)?;
        port.flush()?;
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        if let Some(mut port) = self.port.take() {
            port.flush()?;
            debug!("Closed {}", self.name);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = SerialConfig::default();
        assert_eq!(config.baud_rate, 115_200);
        assert_eq!(config.read_timeout_ms, 10);
    }

    #[test]
    fn test_open_missing_port_is_reported() {
        let config = SerialConfig {
            port: "/dev/pidtune-does-not-exist".to_string(),
            ..SerialConfig::default()
        };
        match SerialTransport::open(&config) {
            Err(TransportError::Open { port, .. }) => assert_eq!(port, config.port),
            Err(other) => panic!("unexpected error: {other}"),
            Ok(_) => panic!("opening a missing port must fail"),
        }
    }
}
