//! 消息总线服务
//!
//! 进程内广播总线：存储提交后的变更通知 (Sync) 经由这里推给所有
//! 订阅者 (成员索引刷新任务、未来的网络传输)。同一集合的通知按
//! 服务端提交顺序送达；不同集合之间不保证顺序。

use shared::message::BusMessage;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

const CHANNEL_CAPACITY: usize = 1024;

#[derive(Clone, Debug)]
pub struct MessageBusService {
    tx: broadcast::Sender<BusMessage>,
    shutdown: CancellationToken,
}

impl MessageBusService {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            shutdown: CancellationToken::new(),
        }
    }

    /// 发布消息；没有订阅者时静默丢弃
    pub fn publish(&self, message: BusMessage) -> usize {
        self.tx.send(message).unwrap_or(0)
    }

    /// 订阅总线
    pub fn subscribe(&self) -> broadcast::Receiver<BusMessage> {
        self.tx.subscribe()
    }

    /// 关停令牌 (后台任务用)
    pub fn shutdown_token(&self) -> &CancellationToken {
        &self.shutdown
    }

    /// 通知所有后台任务退出
    pub fn shutdown(&self) {
        self.shutdown.cancel();
    }
}

impl Default for MessageBusService {
    fn default() -> Self {
        Self::new()
    }
}
