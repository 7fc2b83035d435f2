use chrono::{DateTime, Utc};
use futures::future::{AbortRegistration, Abortable};
use futures::StreamExt;
use log::{debug, warn};
use std::rc::Rc;
use std::sync::Arc;
use std::time::SystemTime;

use crate::core::error::DownloadError;
use crate::core::transport::{TransferRequest, Transport};
use super::handle::TaskShared;
use super::util::FileSink;

const HTTP_PARTIAL_CONTENT: u16 = 206;
const HTTP_RANGE_NOT_SATISFIABLE: u16 = 416;

/// 一次传输的结果，由任务 actor 在完成回调中解释
#[derive(Debug)]
pub(crate) enum TransferOutcome {
    Completed,
    RangeNotSatisfiable,
    ModifiedSinceLocalCopy,
    Failed(DownloadError),
    Aborted,
}

pub(crate) struct TransferJob {
    pub transport: Rc<dyn Transport>,
    pub request: TransferRequest,
    pub shared: Arc<TaskShared>,
}

/// 执行一次传输。中止时内部 future 先被丢弃，随后关闭文件，最后才返回。
pub(crate) async fn run(job: TransferJob, mut sink: FileSink, registration: AbortRegistration) -> TransferOutcome {
    let outcome = Abortable::new(stream_into(&job, &mut sink), registration)
        .await
        .unwrap_or(TransferOutcome::Aborted);

    match sink.close() {
        Ok(_) => outcome,
        Err(e) if matches!(outcome, TransferOutcome::Completed) => TransferOutcome::Failed(e.into()),
        Err(e) => {
            warn!("关闭本地文件失败: {}", e);
            outcome
        }
    }
}

async fn stream_into(job: &TransferJob, sink: &mut FileSink) -> TransferOutcome {
    let offset = job.request.offset;
    let local_modified = sink.modified();

    let mut response = match job.transport.fetch(&job.request).await {
        Ok(response) => response,
        Err(e) => return TransferOutcome::Failed(e),
    };
    debug!("收到响应: {} {:?}", job.request.url, response);

    let status = response.status;
    let mime_type = response.content_type.clone();
    job.shared.update(|info| {
        info.http_status = Some(status);
        if mime_type.is_some() {
            info.mime_type = mime_type;
        }
    });

    if status == HTTP_RANGE_NOT_SATISFIABLE {
        return TransferOutcome::RangeNotSatisfiable;
    }
    if !(200..300).contains(&status) {
        return TransferOutcome::Failed(DownloadError::ServerError(status));
    }

    if offset > 0 {
        if is_modified_since(response.last_modified, local_modified) {
            return TransferOutcome::ModifiedSinceLocalCopy;
        }
        if status == HTTP_PARTIAL_CONTENT {
            if response.content_range_start != Some(offset) {
                return TransferOutcome::Failed(DownloadError::RangeMismatch {
                    expected: offset,
                    actual: response.content_range_start,
                });
            }
        } else {
            warn!("服务器忽略了续传请求 (HTTP {})，从头下载: {}", status, job.request.url);
            if let Err(e) = sink.truncate() {
                return TransferOutcome::Failed(e.into());
            }
            job.shared.set_bytes(0);
        }
    }

    let expected = response.content_length.map(|len| sink.position() + len);
    while let Some(chunk) = response.body.next().await {
        let bytes = match chunk {
            Ok(bytes) => bytes,
            Err(e) => return TransferOutcome::Failed(e),
        };
        if let Err(e) = sink.write(&bytes) {
            return TransferOutcome::Failed(e.into());
        }
        job.shared.add_bytes(bytes.len() as u64);
    }

    if let Some(expected) = expected {
        let actual = sink.position();
        if actual != expected {
            return TransferOutcome::Failed(DownloadError::SizeMismatch { expected, actual });
        }
    }
    TransferOutcome::Completed
}

/// 远端 Last-Modified 晚于本地部分文件的写入时间
fn is_modified_since(remote: Option<DateTime<Utc>>, local: Option<SystemTime>) -> bool {
    match (remote, local) {
        (Some(remote), Some(local)) => remote > DateTime::<Utc>::from(local),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_modified_since() {
        let local = SystemTime::now();
        let older = Utc::now() - Duration::hours(1);
        let newer = Utc::now() + Duration::hours(1);

        assert!(is_modified_since(Some(newer), Some(local)));
        assert!(!is_modified_since(Some(older), Some(local)));
        assert!(!is_modified_since(None, Some(local)));
        assert!(!is_modified_since(Some(newer), None));
    }
}
