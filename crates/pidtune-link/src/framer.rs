//! 换行分隔帧重组
//!
//! 一帧可以跨越任意多次读取，一次读取也可以包含多帧。未以换行结束的
//! 尾部字节保留在缓冲区中，与下一次读取拼接。

/// 重组器输出
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramerOutput {
    /// 完整帧（已去除首尾空白，非空）
    Frame(String),
    /// 某一行不是合法 UTF-8（随后仍以替换字符解码输出该帧）
    DecodeFault(String),
    /// 未完成的帧超过长度上限，缓冲区被清空（参数为被丢弃的字节数）
    Overflow(usize),
}

/// 换行分隔帧重组器
#[derive(Debug)]
pub struct LineFramer {
    carry: Vec<u8>,
    max_frame_len: usize,
}

impl LineFramer {
    pub fn new(max_frame_len: usize) -> Self {
        Self {
            carry: Vec::new(),
            max_frame_len: max_frame_len.max(1),
        }
    }

    /// 追加一次读取的字节，按顺序输出其中完成的帧
    pub fn push(&mut self, chunk: &[u8], mut emit: impl FnMut(FramerOutput)) {
        self.carry.extend_from_slice(chunk);

        let mut start = 0;
        while let Some(offset) = self.carry[start..].iter().position(|&b| b == b'\n') {
            let end = start + offset;
            decode_line(&self.carry[start..end], &mut emit);
            start = end + 1;
        }
        self.carry.drain(..start);

        if self.carry.len() > self.max_frame_len {
            emit(FramerOutput::Overflow(self.carry.len()));
            self.carry.clear();
        }
    }

    /// 尚未完成的字节数
    pub fn pending(&self) -> usize {
        self.carry.len()
    }

    pub fn reset(&mut self) {
        self.carry.clear();
    }
}

/// 非法字节替换为 U+FFFD，先报告故障再输出帧
fn decode_line(line: &[u8], emit: &mut impl FnMut(FramerOutput)) {
    if let Err(e) = std::str::from_utf8(line) {
        emit(FramerOutput::DecodeFault(format!(
            "invalid UTF-8 in frame ({} bytes): {e}",
            line.len()
        )));
    }

    let text = String::from_utf8_lossy(line);
    let text = text.trim();
    if !text.is_empty() {
        emit(FramerOutput::Frame(text.to_string()));
    }
}
