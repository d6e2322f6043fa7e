//! 事件队列
//!
//! 读取线程（及命令发送、扫描线程）入队，调度器出队。入队永不阻塞；
//! 出队非阻塞，空队列时返回 `None`。`EventReceiver` 不可克隆，从类型上
//! 保证单一消费者。

use crossbeam_channel::{Receiver, Sender, TryRecvError, unbounded};

/// 链路事件
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkEvent {
    /// 一个完整帧（已去除首尾空白，非空）
    Frame(String),
    /// 读取路径上的带外故障（解码失败、I/O 错误、超长帧）
    Fault(String),
    /// 本地状态通知（连接、未连接时发送、扫描进度）
    Notice(String),
    /// 连接已关闭：读取线程已退出，本连接不会再有帧入队
    Closed(String),
}

/// 创建一对事件队列端点
pub fn event_queue() -> (EventSender, EventReceiver) {
    let (tx, rx) = unbounded();
    (EventSender { tx }, EventReceiver { rx })
}

/// 事件生产端（可克隆）
#[derive(Debug, Clone)]
pub struct EventSender {
    tx: Sender<LinkEvent>,
}

impl EventSender {
    /// 入队
    ///
    /// 返回 false 表示消费端已经不存在，事件被丢弃。
    pub fn push(&self, event: LinkEvent) -> bool {
        self.tx.send(event).is_ok()
    }

    pub fn frame(&self, frame: impl Into<String>) -> bool {
        self.push(LinkEvent::Frame(frame.into()))
    }

    pub fn fault(&self, message: impl Into<String>) -> bool {
        self.push(LinkEvent::Fault(message.into()))
    }

    pub fn notice(&self, message: impl Into<String>) -> bool {
        self.push(LinkEvent::Notice(message.into()))
    }

    pub fn closed(&self, message: impl Into<String>) -> bool {
        self.push(LinkEvent::Closed(message.into()))
    }
}

/// 事件消费端（唯一）
#[derive(Debug)]
pub struct EventReceiver {
    rx: Receiver<LinkEvent>,
}

impl EventReceiver {
    /// 非阻塞出队
    pub fn try_pop(&self) -> Option<LinkEvent> {
        match self.rx.try_recv() {
            Ok(event) => Some(event),
            Err(TryRecvError::Empty | TryRecvError::Disconnected) => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rx.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// 取出调用时刻已在队列中的事件
    ///
    /// 调用之后入队的事件留给下一次调用，保证每次排空有界。
    pub fn drain_available(&self) -> impl Iterator<Item = LinkEvent> + '_ {
        let available = self.len();
        (0..available).map_while(|_| self.try_pop())
    }
}
