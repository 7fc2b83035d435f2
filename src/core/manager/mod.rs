//! 下载管理器：URL -> 任务的转换与队列操作
//!
//! 本地路径为 `<temp_root>/<sha256(url)>/<解码后的文件名>`，
//! 同一 URL 再次请求时会落到同一个部分文件上，从而可以续传。

pub mod paths;
pub mod registry;


use log::{debug, info};
use std::path::Path;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::broadcast;

use crate::config::Config;
use crate::core::error::{DownloadError, DownloadResult};
use crate::core::group::{DownloadEvent, DownloadGroup, GroupStatus};
use crate::core::task::{DownloadTask, TaskSpec};
use crate::core::transport::{AwcTransport, Transport};

pub use registry::{TaskConstructor, TaskRegistry};

pub struct DownloadManager {
    config: Config,
    transport: Rc<dyn Transport>,
    registry: TaskRegistry,
    group: DownloadGroup,
    disposed: AtomicBool,
}

impl DownloadManager {
    /// 创建管理器并启动其调度组
    pub fn new(config: Config, transport: Rc<dyn Transport>, registry: TaskRegistry) -> Self {
        let group = DownloadGroup::new(
            config.max_concurrent_downloads,
            Duration::from_millis(config.sample_interval_ms),
        );
        group.start();
        info!(
            "下载管理器已创建: 临时目录 {}, 并发上限 {}",
            config.temp_root, config.max_concurrent_downloads
        );
        Self {
            config,
            transport,
            registry,
            group,
            disposed: AtomicBool::new(false),
        }
    }

    /// 使用 awc 传输与空注册表
    pub fn with_defaults(config: Config) -> Self {
        let transport = Rc::new(AwcTransport::new(&config));
        Self::new(config, transport, TaskRegistry::new())
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::Acquire)
    }

    /// 由 URL 创建处于 Ready 状态的任务，不会加入队列
    pub fn create_task(&self, url: &str, user_state: Option<serde_json::Value>) -> DownloadResult<DownloadTask> {
        if self.is_disposed() {
            return Err(DownloadError::Disposed);
        }
        let remote_uri = paths::parse_remote_url(url)?;
        let file_name = paths::file_name_from_url(&remote_uri)?;
        let local_path = paths::local_path_for(Path::new(&self.config.temp_root), &remote_uri)?;
        debug!("创建任务: {} -> {}", remote_uri, local_path.display());

        let spec = TaskSpec {
            user_state,
            write_buffer_size: self.config.write_buffer_size,
            ..TaskSpec::new(remote_uri, local_path, self.transport.clone())
        };
        Ok(self.registry.create(&file_name, spec))
    }

    pub fn queue_download(&self, task: DownloadTask) {
        self.queue_downloads(vec![task]);
    }

    pub fn queue_downloads(&self, tasks: Vec<DownloadTask>) {
        if self.is_disposed() || tasks.is_empty() {
            return;
        }
        self.group.add_tasks(tasks);
    }

    /// 只从队列中移除；正在运行的任务需要调用方自行停止或取消
    pub fn remove_download(&self, task: &DownloadTask) {
        self.remove_downloads(vec![task.clone()]);
    }

    pub fn remove_downloads(&self, tasks: Vec<DownloadTask>) {
        if self.is_disposed() || tasks.is_empty() {
            return;
        }
        self.group.remove_tasks(tasks);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<DownloadEvent> {
        self.group.subscribe()
    }

    pub async fn status(&self) -> DownloadResult<GroupStatus> {
        self.group.status().await
    }

    pub async fn tasks(&self) -> DownloadResult<Vec<DownloadTask>> {
        self.group.tasks().await
    }

    /// 停止调度组并等待在途任务落定，然后释放任务集合；可重复调用
    pub async fn dispose(&self) -> DownloadResult<()> {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        info!("正在释放下载管理器");
        self.group.stop(true).await?;
        self.group.replace_tasks(Vec::new());
        info!("下载管理器已释放");
        Ok(())
    }
}
