use actix::{Actor, Addr, Recipient};
use std::fmt;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::watch;
use url::Url;
use uuid::Uuid;

use crate::core::error::{DownloadError, ErrorKind};
use crate::core::transport::Transport;
use super::actor::DownloadTaskActor;
use super::messages::*;
use super::retry::RetryPolicy;
use super::state::{TaskInfo, TaskState};

/// 下载成功后的格式相关后处理
pub trait PostProcessor: Send + Sync {
    fn name(&self) -> &str;
    fn process(&self, path: &Path) -> Result<(), DownloadError>;
}

/// 构造任务所需的全部输入
pub struct TaskSpec {
    pub remote_uri: Url,
    pub local_path: PathBuf,
    pub user_state: Option<serde_json::Value>,
    pub transport: Rc<dyn Transport>,
    pub write_buffer_size: usize,
    pub retry_policy: RetryPolicy,
    pub post_processor: Option<Arc<dyn PostProcessor>>,
}

impl TaskSpec {
    pub fn new(remote_uri: Url, local_path: PathBuf, transport: Rc<dyn Transport>) -> Self {
        Self {
            remote_uri,
            local_path,
            user_state: None,
            transport,
            write_buffer_size: 256 * 1024,
            retry_policy: RetryPolicy::default(),
            post_processor: None,
        }
    }

    pub fn with_post_processor(mut self, processor: Arc<dyn PostProcessor>) -> Self {
        self.post_processor = Some(processor);
        self
    }
}

/// 任务共享状态：任务 actor 是唯一写者，watch 通道即任务级互斥锁
pub(crate) struct TaskShared {
    info: watch::Sender<TaskInfo>,
    bytes_received: AtomicU64,
}

impl TaskShared {
    pub(crate) fn new() -> Self {
        let (info, _) = watch::channel(TaskInfo::default());
        Self {
            info,
            bytes_received: AtomicU64::new(0),
        }
    }

    pub(crate) fn update(&self, modify: impl FnOnce(&mut TaskInfo)) {
        self.info.send_modify(modify);
    }

    pub(crate) fn info(&self) -> TaskInfo {
        self.info.borrow().clone()
    }

    pub(crate) fn state(&self) -> TaskState {
        self.info.borrow().state
    }

    pub(crate) fn bytes(&self) -> u64 {
        self.bytes_received.load(Ordering::Acquire)
    }

    pub(crate) fn set_bytes(&self, bytes: u64) {
        self.bytes_received.store(bytes, Ordering::Release);
    }

    pub(crate) fn add_bytes(&self, bytes: u64) {
        self.bytes_received.fetch_add(bytes, Ordering::AcqRel);
    }
}

/// 下载任务句柄
///
/// 可廉价克隆；所有控制操作都投递给任务 actor 串行处理，
/// 读取操作直接读取共享快照。
#[derive(Clone)]
pub struct DownloadTask {
    id: Uuid,
    remote_uri: Url,
    local_path: PathBuf,
    user_state: Option<serde_json::Value>,
    addr: Addr<DownloadTaskActor>,
    shared: Arc<TaskShared>,
}

impl DownloadTask {
    /// 在当前 actix 系统中启动任务 actor，初始状态为 Ready
    pub fn spawn(spec: TaskSpec) -> Self {
        let id = Uuid::new_v4();
        let shared = Arc::new(TaskShared::new());
        let remote_uri = spec.remote_uri.clone();
        let local_path = spec.local_path.clone();
        let user_state = spec.user_state.clone();
        let addr = DownloadTaskActor::new(id, spec, shared.clone()).start();
        Self {
            id,
            remote_uri,
            local_path,
            user_state,
            addr,
            shared,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn remote_uri(&self) -> &Url {
        &self.remote_uri
    }

    pub fn local_path(&self) -> &Path {
        &self.local_path
    }

    pub fn user_state(&self) -> Option<&serde_json::Value> {
        self.user_state.as_ref()
    }

    pub fn bytes_received(&self) -> u64 {
        self.shared.bytes()
    }

    pub fn state(&self) -> TaskState {
        self.shared.state()
    }

    pub fn info(&self) -> TaskInfo {
        self.shared.info()
    }

    pub fn mime_type(&self) -> Option<String> {
        self.shared.info().mime_type
    }

    pub fn http_status(&self) -> Option<u16> {
        self.shared.info().http_status
    }

    pub fn error(&self) -> Option<ErrorKind> {
        self.shared.info().error
    }

    /// 启动任务。排入调度组的任务由调度组启动，直接调用会绕过并发上限。
    pub fn start(&self) {
        self.addr.do_send(StartTask);
    }

    pub fn pause(&self) {
        self.addr.do_send(PauseTask);
    }

    pub fn resume(&self) {
        self.addr.do_send(ResumeTask);
    }

    pub fn stop(&self) {
        self.addr.do_send(StopTask);
    }

    /// 异步取消；任务在传输真正中止后才进入 Cancelled
    pub fn cancel(&self) {
        self.addr.do_send(CancelTask);
    }

    /// 等待任务快照满足条件，返回当时的快照
    pub async fn wait_until<F>(&self, mut predicate: F) -> TaskInfo
    where
        F: FnMut(&TaskInfo) -> bool,
    {
        let mut rx = self.shared.info.subscribe();
        let result = rx.wait_for(|info| predicate(info)).await.map(|info| info.clone());
        match result {
            Ok(info) => info,
            Err(_) => self.info(),
        }
    }

    /// 等待任务离开运行态（终止或暂停）
    pub async fn wait_settled(&self) -> TaskInfo {
        self.wait_until(|info| info.state.is_settled()).await
    }

    pub(crate) fn attach(&self, observer: Recipient<TaskEvent>) {
        self.addr.do_send(AttachObserver(observer));
    }
}

impl PartialEq for DownloadTask {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for DownloadTask {}

impl fmt::Debug for DownloadTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DownloadTask")
            .field("id", &self.id)
            .field("remote_uri", &self.remote_uri.as_str())
            .field("local_path", &self.local_path)
            .field("state", &self.state())
            .field("bytes_received", &self.bytes_received())
            .finish()
    }
}
