//! 内存 Mock 传输（测试用）
//!
//! `MockTransport` 可以克隆：测试代码保留一个副本，在 `split()` 之后继续注入
//! 读取数据、检查写入内容。

use crate::{Transport, TransportError, TransportReader, TransportWriter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::io;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

enum MockRead {
    Bytes(Vec<u8>),
    Fault(String),
}

#[derive(Default)]
struct MockShared {
    incoming: Mutex<VecDeque<MockRead>>,
    written: Mutex<Vec<Vec<u8>>>,
    closed: AtomicBool,
    fail_writes: AtomicBool,
    read_calls: AtomicU64,
}

/// 内存 Mock 传输
#[derive(Clone, Default)]
pub struct MockTransport {
    shared: Arc<MockShared>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// 注入一块待读取的数据（一次 `read_available` 最多返回一块）
    pub fn push_bytes(&self, bytes: impl Into<Vec<u8>>) {
        self.shared
            .incoming
            .lock()
            .push_back(MockRead::Bytes(bytes.into()));
    }

    /// 注入一次读取故障
    pub fn push_fault(&self, message: impl Into<String>) {
        self.shared
            .incoming
            .lock()
            .push_back(MockRead::Fault(message.into()));
    }

    /// 尚未被读取的数据块数量
    pub fn pending_reads(&self) -> usize {
        self.shared.incoming.lock().len()
    }

    /// 让后续写入失败
    pub fn set_fail_writes(&self, fail: bool) {
        self.shared.fail_writes.store(fail, Ordering::Relaxed);
    }

    /// 已写入的数据（按写入调用分组）
    pub fn written(&self) -> Vec<Vec<u8>> {
        self.shared.written.lock().clone()
    }

    /// 已写入的数据（拼接为文本）
    pub fn written_text(&self) -> String {
        let written = self.shared.written.lock();
        written
            .iter()
            .map(|chunk| String::from_utf8_lossy(chunk))
            .collect()
    }

    pub fn is_closed(&self) -> bool {
        self.shared.closed.load(Ordering::Acquire)
    }

    pub fn read_calls(&self) -> u64 {
        self.shared.read_calls.load(Ordering::Relaxed)
    }
}

impl Transport for MockTransport {
    type Reader = MockReader;
    type Writer = MockWriter;

    fn split(self) -> Result<(MockReader, MockWriter), TransportError> {
        Ok((
            MockReader {
                shared: self.shared.clone(),
            },
            MockWriter {
                shared: self.shared,
            },
        ))
    }
}

/// Mock 读端
pub struct MockReader {
    shared: Arc<MockShared>,
}

impl TransportReader for MockReader {
    fn read_available(&mut self, buf: &mut [u8]) -> Result<usize, TransportError> {
        self.shared.read_calls.fetch_add(1, Ordering::Relaxed);

        if self.shared.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }

        let mut incoming = self.shared.incoming.lock();
        match incoming.pop_front() {
            None => Ok(0),
            Some(MockRead::Fault(message)) => Err(io::Error::other(message).into()),
            Some(MockRead::Bytes(mut bytes)) => {
                if bytes.len() > buf.len() {
                    let rest = bytes.split_off(buf.len());
                    incoming.push_front(MockRead::Bytes(rest));
                }
                buf[..bytes.len()].copy_from_slice(&bytes);
                Ok(bytes.len())
            },
        }
    }
}

/// Mock 写端
pub struct MockWriter {
    shared: Arc<MockShared>,
}

impl TransportWriter for MockWriter {
    fn write_all(&mut self, bytes: &[u8]) -> Result<(), TransportError> {
        if self.shared.closed.load(Ordering::Acquire) {
            return Err(TransportError::Closed);
        }
        if self.shared.fail_writes.load(Ordering::Relaxed) {
            return Err(io::Error::new(io::ErrorKind::BrokenPipe, "mock write failure").into());
        }
        self.shared.written.lock().push(bytes.to_vec());
        Ok(())
    }

    fn close(&mut self) -> Result<(), TransportError> {
        self.shared.closed.store(true, Ordering::Release);
        Ok(())
    }
}
