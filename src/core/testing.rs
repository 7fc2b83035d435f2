//! 测试用的脚本化传输实现

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::{self, StreamExt};
use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::rc::Rc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::core::error::DownloadError;
use crate::core::transport::{TransferRequest, TransferResponse, Transport};

/// 响应体的行为
pub enum MockBody {
    /// 依次发送后结束
    Chunks(Vec<Bytes>),
    /// 发送后永远挂起，模拟慢速连接
    Stall(Vec<Bytes>),
    /// 等到信号后再发送
    Gated(Vec<Bytes>, oneshot::Receiver<()>),
}

pub struct MockResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    pub content_range_start: Option<u64>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub body: MockBody,
}

impl MockResponse {
    /// 200，完整内容
    pub fn ok(data: &[u8]) -> Self {
        Self {
            status: 200,
            content_length: Some(data.len() as u64),
            content_range_start: None,
            content_type: Some("audio/mpeg".to_string()),
            last_modified: None,
            body: MockBody::Chunks(chunked(data)),
        }
    }

    /// 206，从 offset 开始的剩余内容
    pub fn partial(offset: u64, rest: &[u8]) -> Self {
        Self {
            status: 206,
            content_length: Some(rest.len() as u64),
            content_range_start: Some(offset),
            content_type: Some("audio/mpeg".to_string()),
            last_modified: None,
            body: MockBody::Chunks(chunked(rest)),
        }
    }

    /// 只有状态码、没有内容的响应
    pub fn status(status: u16) -> Self {
        Self {
            status,
            content_length: Some(0),
            content_range_start: None,
            content_type: None,
            last_modified: None,
            body: MockBody::Chunks(Vec::new()),
        }
    }

    /// 发送一部分数据后挂起
    pub fn stalled(head: &[u8]) -> Self {
        Self {
            status: 200,
            content_length: None,
            content_range_start: None,
            content_type: Some("audio/mpeg".to_string()),
            last_modified: None,
            body: MockBody::Stall(chunked(head)),
        }
    }

    /// 收到信号后才发送数据，返回信号发送端
    pub fn gated(data: &[u8]) -> (Self, oneshot::Sender<()>) {
        let (tx, rx) = oneshot::channel();
        let response = Self {
            status: 200,
            content_length: Some(data.len() as u64),
            content_range_start: None,
            content_type: Some("audio/mpeg".to_string()),
            last_modified: None,
            body: MockBody::Gated(chunked(data), rx),
        };
        (response, tx)
    }

    pub fn with_last_modified(mut self, at: DateTime<Utc>) -> Self {
        self.last_modified = Some(at);
        self
    }
}

fn chunked(data: &[u8]) -> Vec<Bytes> {
    data.chunks(64).map(Bytes::copy_from_slice).collect()
}

/// 按 URL 回放预设响应，并记录每次请求
#[derive(Default)]
pub struct MockTransport {
    scripts: RefCell<HashMap<String, VecDeque<MockResponse>>>,
    requests: RefCell<Vec<TransferRequest>>,
}

impl MockTransport {
    pub fn new() -> Rc<Self> {
        Rc::new(Self::default())
    }

    pub fn script(&self, url: &str, response: MockResponse) {
        self.scripts
            .borrow_mut()
            .entry(url.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<TransferRequest> {
        self.requests.borrow().clone()
    }

    pub fn offsets_for(&self, url: &str) -> Vec<u64> {
        self.requests
            .borrow()
            .iter()
            .filter(|r| r.url.as_str() == url)
            .map(|r| r.offset)
            .collect()
    }
}

#[async_trait(?Send)]
impl Transport for MockTransport {
    async fn fetch(&self, request: &TransferRequest) -> Result<TransferResponse, DownloadError> {
        self.requests.borrow_mut().push(request.clone());
        let scripted = self
            .scripts
            .borrow_mut()
            .get_mut(request.url.as_str())
            .and_then(|queue| queue.pop_front());
        let Some(scripted) = scripted else {
            return Err(DownloadError::NetworkError(format!("没有预设响应: {}", request.url)));
        };

        let body = match scripted.body {
            MockBody::Chunks(chunks) => stream::iter(chunks.into_iter().map(Ok)).boxed_local(),
            MockBody::Stall(chunks) => stream::iter(chunks.into_iter().map(Ok))
                .chain(stream::pending())
                .boxed_local(),
            MockBody::Gated(chunks, gate) => stream::once(async move {
                let _ = gate.await;
                stream::iter(chunks.into_iter().map(Ok))
            })
            .flatten()
            .boxed_local(),
        };

        Ok(TransferResponse {
            status: scripted.status,
            content_length: scripted.content_length,
            content_range_start: scripted.content_range_start,
            content_type: scripted.content_type,
            last_modified: scripted.last_modified,
            body,
        })
    }
}

/// 轮询直到条件成立；超时视为测试失败
pub async fn eventually<F>(mut condition: F)
where
    F: FnMut() -> bool,
{
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    while !condition() {
        assert!(tokio::time::Instant::now() < deadline, "条件在 5 秒内未满足");
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// 给异步等待加上超时
pub async fn within<T>(future: impl Future<Output = T>) -> T {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("等待超时")
}

/// 确定性的测试数据
pub fn payload(len: usize) -> Vec<u8> {
    (0..len).map(|i| (i % 251) as u8).collect()
}
