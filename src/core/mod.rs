//! Core: 下载任务状态机、有界并发调度组、下载管理器等核心逻辑模块

pub mod error;
pub mod group;
pub mod manager;
pub mod task;
pub mod transport;

#[cfg(test)]
pub(crate) mod testing;

// 只导出主流程和其它模块实际用到的类型
pub use error::{DownloadError, DownloadResult, ErrorKind};
pub use group::{DownloadEvent, DownloadGroup, GroupStatus};
pub use manager::{DownloadManager, TaskRegistry};
pub use task::{DownloadTask, PostProcessor, TaskInfo, TaskSpec, TaskState};
pub use transport::{AwcTransport, TransferRequest, TransferResponse, Transport};
