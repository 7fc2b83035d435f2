//! `group` 模块：有界并发的下载调度组
//!
//! - `actor`: `DownloadGroupActor`，维护任务集合与运行集合
//! - `messages`: 调度组消息
//! - `sampler`: 吞吐量采样
//! - `status`: 聚合状态与对外事件

pub mod actor;
pub mod messages;
pub mod sampler;
pub mod status;


use actix::{Actor, Addr};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::core::error::DownloadResult;
use crate::core::task::DownloadTask;
use actor::DownloadGroupActor;
use messages::*;

pub use sampler::RateSampler;
pub use status::{DownloadEvent, GroupStatus, StatusAggregator};

const EVENT_CAPACITY: usize = 256;

/// 调度组句柄
#[derive(Clone)]
pub struct DownloadGroup {
    addr: Addr<DownloadGroupActor>,
    events: broadcast::Sender<DownloadEvent>,
}

impl DownloadGroup {
    /// 创建空的调度组，尚未启动
    pub fn new(max_concurrent: usize, sample_interval: Duration) -> Self {
        Self::with_tasks(Vec::new(), max_concurrent, sample_interval)
    }

    pub fn with_tasks(tasks: Vec<DownloadTask>, max_concurrent: usize, sample_interval: Duration) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let addr = DownloadGroupActor::new(tasks, max_concurrent, sample_interval, events.clone()).start();
        Self { addr, events }
    }

    pub fn start(&self) {
        self.addr.do_send(StartGroup);
    }

    /// 停止调度；返回的 future 在所有在途任务落定后完成
    pub async fn stop(&self, stop_running: bool) -> DownloadResult<()> {
        self.addr.send(StopGroup { stop_running }).await?;
        Ok(())
    }

    pub fn add_tasks(&self, tasks: Vec<DownloadTask>) {
        self.addr.do_send(AddTasks(tasks));
    }

    /// 只做登记上的移除，在途任务继续运行
    pub fn remove_tasks(&self, tasks: Vec<DownloadTask>) {
        self.addr.do_send(RemoveTasks(tasks));
    }

    pub fn replace_tasks(&self, tasks: Vec<DownloadTask>) {
        self.addr.do_send(ReplaceTasks(tasks));
    }

    pub fn execute(&self) {
        self.addr.do_send(Execute);
    }

    pub async fn status(&self) -> DownloadResult<GroupStatus> {
        Ok(self.addr.send(QueryStatus).await?)
    }

    pub async fn tasks(&self) -> DownloadResult<Vec<DownloadTask>> {
        Ok(self.addr.send(ListTasks).await?)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.events.subscribe()
    }
}
