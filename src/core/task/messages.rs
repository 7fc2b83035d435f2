use actix::{Message, Recipient};
use uuid::Uuid;

use crate::core::error::ErrorKind;
use super::state::TaskState;

/// 启动任务（由调度组发出）
pub struct StartTask;
impl Message for StartTask { type Result = (); }

/// 暂停任务；传输进行中时先中止传输
pub struct PauseTask;
impl Message for PauseTask { type Result = (); }

/// 从暂停恢复为就绪，等待调度组重新启动
pub struct ResumeTask;
impl Message for ResumeTask { type Result = (); }

/// 停止任务并保留部分文件
pub struct StopTask;
impl Message for StopTask { type Result = (); }

/// 取消任务并删除部分文件
pub struct CancelTask;
impl Message for CancelTask { type Result = (); }

/// 绑定任务事件的接收者（调度组）
pub struct AttachObserver(pub Recipient<TaskEvent>);
impl Message for AttachObserver { type Result = (); }

/// 任务发给调度组的通知
#[derive(Debug, Clone, PartialEq)]
pub enum TaskEvent {
    /// 本地文件已打开，`bytes_received` 为起始偏移；每次重新开始传输都会发送
    Started { id: Uuid, bytes_received: u64 },
    /// 任务离开运行态（终止或暂停），释放并发槽位
    Stopped {
        id: Uuid,
        state: TaskState,
        bytes_received: u64,
        error: Option<ErrorKind>,
    },
    /// 收到启动请求时任务已不是就绪态
    Declined { id: Uuid },
    /// 任务从暂停恢复为就绪
    Resumed { id: Uuid },
}
impl Message for TaskEvent { type Result = (); }
