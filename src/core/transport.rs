//! 传输原语：一次带可选续传偏移的 HTTP GET
//!
//! 下载任务只依赖 [`Transport`] trait；默认实现 [`AwcTransport`] 基于 awc。
//! 测试中使用脚本化的内存实现替换它。

use async_trait::async_trait;
use awc::http::header;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use futures::stream::LocalBoxStream;
use futures::StreamExt;
use std::time::Duration;
use url::Url;

use crate::config::Config;
use crate::core::error::DownloadError;

/// 一次传输请求
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferRequest {
    pub url: Url,
    /// 续传偏移；0 表示完整请求，不发送 Range 头
    pub offset: u64,
}

/// 传输响应：响应头中与续传相关的字段 + 字节流
pub struct TransferResponse {
    pub status: u16,
    pub content_length: Option<u64>,
    /// `Content-Range: bytes <start>-<end>/<total>` 中的 start
    pub content_range_start: Option<u64>,
    pub content_type: Option<String>,
    pub last_modified: Option<DateTime<Utc>>,
    pub body: LocalBoxStream<'static, Result<Bytes, DownloadError>>,
}

impl std::fmt::Debug for TransferResponse {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransferResponse")
            .field("status", &self.status)
            .field("content_length", &self.content_length)
            .field("content_range_start", &self.content_range_start)
            .field("content_type", &self.content_type)
            .field("last_modified", &self.last_modified)
            .finish_non_exhaustive()
    }
}

#[async_trait(?Send)]
pub trait Transport {
    async fn fetch(&self, request: &TransferRequest) -> Result<TransferResponse, DownloadError>;
}

/// 基于 awc 的默认传输实现
pub struct AwcTransport {
    client: awc::Client,
}

impl AwcTransport {
    pub fn new(config: &Config) -> Self {
        let client = awc::Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .max_redirects(config.max_redirects)
            .add_default_header((header::USER_AGENT, config.user_agent.clone()))
            .finish();
        Self { client }
    }
}

#[async_trait(?Send)]
impl Transport for AwcTransport {
    async fn fetch(&self, request: &TransferRequest) -> Result<TransferResponse, DownloadError> {
        let mut builder = self
            .client
            .get(request.url.as_str())
            .no_decompress()
            .insert_header((header::ACCEPT_ENCODING, "identity"));
        if request.offset > 0 {
            builder = builder.insert_header((header::RANGE, format!("bytes={}-", request.offset)));
        }

        let response = builder
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;

        let headers = response.headers();
        let text = |name: header::HeaderName| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.to_string())
        };
        let status = response.status().as_u16();
        let content_length = text(header::CONTENT_LENGTH).and_then(|s| s.parse::<u64>().ok());
        let content_range_start = text(header::CONTENT_RANGE).and_then(|s| parse_content_range_start(&s));
        let content_type = text(header::CONTENT_TYPE);
        let last_modified = text(header::LAST_MODIFIED).and_then(|s| parse_http_date(&s));

        let body = response
            .map(|chunk| chunk.map_err(|e| DownloadError::NetworkError(e.to_string())))
            .boxed_local();

        Ok(TransferResponse {
            status,
            content_length,
            content_range_start,
            content_type,
            last_modified,
            body,
        })
    }
}

/// 解析 `bytes 1000-1999/2000` 中的起始偏移
pub fn parse_content_range_start(value: &str) -> Option<u64> {
    let range = value.trim().strip_prefix("bytes")?.trim_start();
    let (start, _) = range.split_once('-')?;
    start.trim().parse().ok()
}

/// 解析 HTTP 日期 (RFC 7231 IMF-fixdate)
pub fn parse_http_date(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc2822(value.trim())
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parse_content_range() {
        assert_eq!(parse_content_range_start("bytes 1000-1999/2000"), Some(1000));
        assert_eq!(parse_content_range_start("bytes 0-0/*"), Some(0));
        assert_eq!(parse_content_range_start("bytes */2000"), None);
        assert_eq!(parse_content_range_start("items 1-2/3"), None);
    }

    #[test]
    fn test_parse_http_date() {
        let parsed = parse_http_date("Sun, 06 Nov 1994 08:49:37 GMT");
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(1994, 11, 6, 8, 49, 37).unwrap()));
        assert_eq!(parse_http_date("yesterday"), None);
    }
}
