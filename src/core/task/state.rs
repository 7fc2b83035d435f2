use serde::{Deserialize, Serialize};

use crate::core::error::ErrorKind;

/// 下载任务状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TaskState {
    Ready,
    Running,
    Paused,
    Stopped,
    Cancelled,
    Succeeded,
    Failed,
}

impl TaskState {
    /// 终止状态之后不再发生任何迁移
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            TaskState::Stopped | TaskState::Cancelled | TaskState::Succeeded | TaskState::Failed
        )
    }

    /// 不再占用并发槽位（终止或暂停）
    pub fn is_settled(&self) -> bool {
        self.is_terminal() || *self == TaskState::Paused
    }

    /// 终止时是否保留本地文件
    pub fn keeps_file(&self) -> bool {
        !matches!(self, TaskState::Cancelled | TaskState::Failed)
    }
}

/// 任务可读快照，由任务自身写入
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskInfo {
    pub state: TaskState,
    pub http_status: Option<u16>,
    pub error: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub mime_type: Option<String>,
    pub modified_retries: u32,
    pub range_retries: u32,
}

impl Default for TaskInfo {
    fn default() -> Self {
        Self {
            state: TaskState::Ready,
            http_status: None,
            error: None,
            error_message: None,
            mime_type: None,
            modified_retries: 0,
            range_retries: 0,
        }
    }
}
