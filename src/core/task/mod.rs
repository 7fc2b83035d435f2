//! `task` 模块包含了与单个下载任务相关的所有逻辑
//!
//! 主要包括：
//! - `handle`: 对外的任务句柄 `DownloadTask` 与构造参数 `TaskSpec`
//! - `actor`: `DownloadTaskActor` 状态机
//! - `state`: 任务状态 `TaskState` 与快照 `TaskInfo`
//! - `messages`: Actor 之间传递的消息
//! - `handlers`: 消息处理器
//! - `transfer`: 实际的传输与响应分类逻辑
//! - `retry`: 一次性自动重试预算
//! - `util`: 本地文件写入与清理

pub mod actor;
pub mod handle;
pub mod handlers;
pub mod messages;
pub mod retry;
pub mod state;
pub(crate) mod transfer;
pub mod util;


pub use handle::{DownloadTask, PostProcessor, TaskSpec};
pub use messages::TaskEvent;
pub use retry::{RetryContext, RetryPolicy, RetryReason};
pub use state::{TaskInfo, TaskState};
