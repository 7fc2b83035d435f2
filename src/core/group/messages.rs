use actix::Message;

use crate::core::task::DownloadTask;
use super::status::GroupStatus;

/// 启用调度与采样定时器
pub struct StartGroup;
impl Message for StartGroup { type Result = (); }

/// 停止调度与定时器；完成时所有在途任务都已落定
pub struct StopGroup {
    /// 同时请求在途任务停止（保留部分文件）
    pub stop_running: bool,
}
impl Message for StopGroup { type Result = (); }

/// 加入任务集合并触发一次调度
pub struct AddTasks(pub Vec<DownloadTask>);
impl Message for AddTasks { type Result = (); }

/// 仅从集合中移除，不影响任务本身
pub struct RemoveTasks(pub Vec<DownloadTask>);
impl Message for RemoveTasks { type Result = (); }

/// 整体替换任务集合
pub struct ReplaceTasks(pub Vec<DownloadTask>);
impl Message for ReplaceTasks { type Result = (); }

/// 手动触发一次调度
pub struct Execute;
impl Message for Execute { type Result = (); }

pub struct QueryStatus;
impl Message for QueryStatus { type Result = GroupStatus; }

pub struct ListTasks;
impl Message for ListTasks { type Result = Vec<DownloadTask>; }

