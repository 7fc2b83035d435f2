use actix::prelude::*;
use futures::future::AbortHandle;
use log::{debug, error, info, warn};
use std::path::PathBuf;
use std::rc::Rc;
use std::sync::Arc;
use url::Url;
use uuid::Uuid;

use crate::core::error::{classify_io, DownloadError, ErrorKind};
use crate::core::transport::{TransferRequest, Transport};
use super::handle::{PostProcessor, TaskShared, TaskSpec};
use super::messages::TaskEvent;
use super::retry::{RetryContext, RetryReason};
use super::state::TaskState;
use super::transfer::{self, TransferJob, TransferOutcome};
use super::util::{remove_partial, FileSink};

/// 传输进行中收到的停止意图，强度 Pause < Stop < Cancel
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum StopIntent {
    Pause,
    Stop,
    Cancel,
}

impl StopIntent {
    fn target(self) -> TaskState {
        match self {
            StopIntent::Pause => TaskState::Paused,
            StopIntent::Stop => TaskState::Stopped,
            StopIntent::Cancel => TaskState::Cancelled,
        }
    }
}

/// 单任务 Actor
pub struct DownloadTaskActor {
    pub id: Uuid,
    pub remote_uri: Url,
    pub local_path: PathBuf,
    pub(crate) shared: Arc<TaskShared>,
    transport: Rc<dyn Transport>,
    post_processor: Option<Arc<dyn PostProcessor>>,
    write_buffer_size: usize,
    retry: RetryContext,
    observer: Option<Recipient<TaskEvent>>,
    intent: Option<StopIntent>,
    live: Option<AbortHandle>,
    /// 本轮运行是否已经落定，保证终态最多写入一次
    finalized: bool,
}

impl Actor for DownloadTaskActor {
    type Context = Context<Self>;
}

impl DownloadTaskActor {
    pub(crate) fn new(id: Uuid, spec: TaskSpec, shared: Arc<TaskShared>) -> Self {
        Self {
            id,
            remote_uri: spec.remote_uri,
            local_path: spec.local_path,
            shared,
            transport: spec.transport,
            post_processor: spec.post_processor,
            write_buffer_size: spec.write_buffer_size,
            retry: RetryContext::new(spec.retry_policy),
            observer: None,
            intent: None,
            live: None,
            finalized: false,
        }
    }

    pub(crate) fn set_observer(&mut self, observer: Recipient<TaskEvent>) {
        self.observer = Some(observer);
    }

    pub(crate) fn notify(&self, event: TaskEvent) {
        if let Some(observer) = &self.observer {
            let _ = observer.do_send(event);
        }
    }

    /// Ready -> Running
    pub(crate) fn begin(&mut self, ctx: &mut Context<Self>) {
        self.intent = None;
        self.finalized = false;
        self.open_and_transfer(ctx);
    }

    /// 打开本地文件并发起传输；本地错误直接失败，不发网络请求
    fn open_and_transfer(&mut self, ctx: &mut Context<Self>) {
        let sink = match FileSink::open(&self.local_path, self.write_buffer_size) {
            Ok(sink) => sink,
            Err(e) => {
                let kind = classify_io(&e);
                error!("打开本地文件失败: {} - {}", self.local_path.display(), e);
                self.finalize(TaskState::Failed, Some((kind, DownloadError::IoError(e).to_string())));
                return;
            }
        };

        let offset = sink.offset();
        self.shared.set_bytes(offset);
        self.shared.update(|info| {
            info.state = TaskState::Running;
            info.error = None;
            info.error_message = None;
        });
        info!("开始下载: {} (偏移 {} 字节)", self.remote_uri, offset);
        self.notify(TaskEvent::Started {
            id: self.id,
            bytes_received: offset,
        });

        let (abort, registration) = AbortHandle::new_pair();
        self.live = Some(abort);
        let job = TransferJob {
            transport: self.transport.clone(),
            request: TransferRequest {
                url: self.remote_uri.clone(),
                offset,
            },
            shared: self.shared.clone(),
        };
        ctx.spawn(
            transfer::run(job, sink, registration)
                .into_actor(self)
                .map(|outcome, act, ctx| act.on_transfer_finished(outcome, ctx)),
        );
    }

    /// 传输完成回调：先看停止意图，再按结果落定或重试
    fn on_transfer_finished(&mut self, outcome: TransferOutcome, ctx: &mut Context<Self>) {
        self.live = None;
        if self.finalized {
            return;
        }

        if let Some(intent) = self.intent.take() {
            debug!("传输已中止，按意图 {:?} 落定: {}", intent, self.remote_uri);
            self.finalize(intent.target(), None);
            return;
        }

        match outcome {
            TransferOutcome::Completed => self.complete(),
            TransferOutcome::RangeNotSatisfiable => {
                self.retry_or_fail(RetryReason::RangeNotSatisfiable, ctx)
            }
            TransferOutcome::ModifiedSinceLocalCopy => {
                self.retry_or_fail(RetryReason::ModifiedSinceLocalCopy, ctx)
            }
            TransferOutcome::Failed(e) => {
                error!("下载失败: {} - {}", self.remote_uri, e);
                self.finalize(TaskState::Failed, Some((e.kind(), e.to_string())));
            }
            TransferOutcome::Aborted => {
                self.finalize(
                    TaskState::Failed,
                    Some((ErrorKind::Unknown, "传输在没有停止请求的情况下被中止".to_string())),
                );
            }
        }
    }

    fn complete(&mut self) {
        if let Some(processor) = self.post_processor.clone() {
            if let Err(e) = processor.process(&self.local_path) {
                error!("后处理 {} 失败: {} - {}", processor.name(), self.local_path.display(), e);
                self.finalize(TaskState::Failed, Some((ErrorKind::Unknown, e.to_string())));
                return;
            }
        }
        info!("下载完成: {} -> {}", self.remote_uri, self.local_path.display());
        self.finalize(TaskState::Succeeded, None);
    }

    fn retry_or_fail(&mut self, reason: RetryReason, ctx: &mut Context<Self>) {
        if !self.retry.try_retry(reason) {
            let (kind, err) = match reason {
                RetryReason::RangeNotSatisfiable => (ErrorKind::HttpError, DownloadError::RangeNotSatisfiable),
                RetryReason::ModifiedSinceLocalCopy => (
                    ErrorKind::ModifiedSincePreviousDownload,
                    DownloadError::ModifiedSincePreviousDownload,
                ),
            };
            error!("重试次数已用尽: {} - {}", self.remote_uri, err);
            self.finalize(TaskState::Failed, Some((kind, err.to_string())));
            return;
        }

        let (range_retries, modified_retries) = (self.retry.range_retries, self.retry.modified_retries);
        self.shared.update(|info| {
            info.range_retries = range_retries;
            info.modified_retries = modified_retries;
        });
        warn!("{:?}，删除本地文件后重新下载: {}", reason, self.remote_uri);

        if let Err(e) = remove_partial(&self.local_path) {
            let kind = classify_io(&e);
            self.finalize(TaskState::Failed, Some((kind, DownloadError::IoError(e).to_string())));
            return;
        }
        self.open_and_transfer(ctx);
    }

    /// 暂停/停止/取消的公共路径：传输进行中则记录意图并中止，否则立即落定
    pub(crate) fn request_halt(&mut self, intent: StopIntent) {
        let state = self.shared.state();
        if state.is_terminal() {
            return;
        }

        if let Some(abort) = &self.live {
            let next = self.intent.map_or(intent, |current| current.max(intent));
            self.intent = Some(next);
            abort.abort();
            debug!("已请求中止传输 ({:?}): {}", next, self.remote_uri);
            return;
        }

        if state == TaskState::Paused && intent == StopIntent::Pause {
            return;
        }
        self.finalize(intent.target(), None);
    }

    /// 写入终态（或暂停），按需清理文件并通知调度组
    fn finalize(&mut self, state: TaskState, error: Option<(ErrorKind, String)>) {
        self.finalized = true;
        self.live = None;

        if !state.keeps_file() {
            if let Err(e) = remove_partial(&self.local_path) {
                warn!("删除部分文件失败: {} - {}", self.local_path.display(), e);
            }
        }

        let kind = error.as_ref().map(|(kind, _)| *kind);
        self.shared.update(|info| {
            info.state = state;
            if let Some((kind, message)) = error {
                info.error = Some(kind);
                info.error_message = Some(message);
            }
        });

        self.notify(TaskEvent::Stopped {
            id: self.id,
            state,
            bytes_received: self.shared.bytes(),
            error: kind,
        });
    }
}
