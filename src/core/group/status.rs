use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use url::Url;
use uuid::Uuid;

use crate::core::error::ErrorKind;
use crate::core::task::TaskState;

/// 调度组的聚合状态
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct GroupStatus {
    /// 尚未完成且未在运行的任务（就绪或暂停）
    pub remaining: usize,
    pub running: usize,
    /// 已进入终止状态的任务
    pub completed: usize,
    pub bytes_per_second: f64,
}

/// 对外广播的下载事件
#[derive(Debug, Clone, PartialEq)]
pub enum DownloadEvent {
    TaskStarted {
        id: Uuid,
        remote_uri: Url,
    },
    TaskStopped {
        id: Uuid,
        state: TaskState,
        error: Option<ErrorKind>,
    },
    StatusChanged(GroupStatus),
}

/// 状态聚合器：状态变化时发出一次 StatusChanged
pub struct StatusAggregator {
    current: GroupStatus,
    events: broadcast::Sender<DownloadEvent>,
}

impl StatusAggregator {
    pub fn new(events: broadcast::Sender<DownloadEvent>) -> Self {
        Self {
            current: GroupStatus::default(),
            events,
        }
    }

    pub fn status(&self) -> GroupStatus {
        self.current
    }

    /// 任务集合被整体替换时调用
    pub fn reset(&mut self) {
        self.current = GroupStatus::default();
        self.on_status_changed();
    }

    pub fn set_counts(&mut self, remaining: usize, running: usize, completed: usize) {
        let next = GroupStatus {
            remaining,
            running,
            completed,
            ..self.current
        };
        if next != self.current {
            self.current = next;
            self.on_status_changed();
        }
    }

    /// 只有数值变化时才通知
    pub fn set_transfer_rate(&mut self, bytes_per_second: f64) {
        let rate = bytes_per_second.max(0.0);
        if rate != self.current.bytes_per_second {
            self.current.bytes_per_second = rate;
            self.on_status_changed();
        }
    }

    fn on_status_changed(&self) {
        // 没有订阅者时发送失败，忽略即可
        let _ = self.events.send(DownloadEvent::StatusChanged(self.current));
    }
}
