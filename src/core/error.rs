use serde::{Deserialize, Serialize};
use std::io;
use thiserror::Error;

/// 任务级错误分类，决定任务终止方式与是否自动重试
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    /// 本地文件被操作系统拒绝访问
    UnauthorizedFileAccess,
    /// 本地文件被其他进程占用
    SharingViolation,
    /// 传输层或协议层的不可恢复错误
    HttpError,
    /// 服务器拒绝续传区间 (HTTP 416)
    RangeNotSatisfiable,
    /// 远端资源在本地部分文件写入之后被修改
    ModifiedSincePreviousDownload,
    /// 其他本地 I/O 异常
    Unknown,
}

impl ErrorKind {
    /// 是否属于可自动重试一次的类别
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ErrorKind::RangeNotSatisfiable | ErrorKind::ModifiedSincePreviousDownload
        )
    }
}

#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("IO错误: {0}")]
    IoError(#[from] io::Error),

    #[error("无效的URL: {0}")]
    InvalidUrl(String),

    #[error("网络错误: {0}")]
    NetworkError(String),

    #[error("服务器错误: HTTP {0}")]
    ServerError(u16),

    #[error("请求区间无法满足 (HTTP 416)")]
    RangeNotSatisfiable,

    #[error("远端文件在上次下载后已被修改")]
    ModifiedSincePreviousDownload,

    #[error("续传偏移不一致: 请求 {expected}, 服务器返回 {actual:?}")]
    RangeMismatch {
        expected: u64,
        actual: Option<u64>,
    },

    #[error("文件大小不匹配: 预期 {expected} 字节, 实际 {actual} 字节")]
    SizeMismatch {
        expected: u64,
        actual: u64,
    },

    #[error("后处理失败: {0}")]
    PostProcess(String),

    #[error("配置无效: {0}")]
    InvalidConfig(String),

    #[error("下载管理器已释放")]
    Disposed,

    #[error("Actor 通信失败: {0}")]
    Mailbox(#[from] actix::MailboxError),

    #[error("未知错误: {0}")]
    Unknown(String),
}

impl DownloadError {
    /// 映射到任务级错误分类
    pub fn kind(&self) -> ErrorKind {
        match self {
            DownloadError::IoError(e) => classify_io(e),
            DownloadError::NetworkError(_)
            | DownloadError::ServerError(_)
            | DownloadError::RangeMismatch { .. }
            | DownloadError::SizeMismatch { .. } => ErrorKind::HttpError,
            DownloadError::RangeNotSatisfiable => ErrorKind::RangeNotSatisfiable,
            DownloadError::ModifiedSincePreviousDownload => ErrorKind::ModifiedSincePreviousDownload,
            _ => ErrorKind::Unknown,
        }
    }
}

/// 对本地文件错误进行分类
pub fn classify_io(error: &io::Error) -> ErrorKind {
    if error.kind() == io::ErrorKind::PermissionDenied {
        return ErrorKind::UnauthorizedFileAccess;
    }
    match error.raw_os_error() {
        Some(code) if SHARING_VIOLATION_CODES.contains(&code) => ErrorKind::SharingViolation,
        _ => ErrorKind::Unknown,
    }
}

// ERROR_SHARING_VIOLATION / ERROR_LOCK_VIOLATION
#[cfg(windows)]
const SHARING_VIOLATION_CODES: [i32; 2] = [32, 33];
// EBUSY / ETXTBSY
#[cfg(not(windows))]
const SHARING_VIOLATION_CODES: [i32; 2] = [16, 26];

impl From<String> for DownloadError {
    fn from(error: String) -> Self {
        DownloadError::Unknown(error)
    }
}

impl From<&str> for DownloadError {
    fn from(error: &str) -> Self {
        DownloadError::Unknown(error.to_string())
    }
}

pub type DownloadResult<T> = Result<T, DownloadError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(DownloadError::ServerError(404).kind(), ErrorKind::HttpError);
        assert_eq!(
            DownloadError::NetworkError("connection reset".to_string()).kind(),
            ErrorKind::HttpError
        );
        assert_eq!(
            DownloadError::RangeNotSatisfiable.kind(),
            ErrorKind::RangeNotSatisfiable
        );
        assert_eq!(
            DownloadError::SizeMismatch { expected: 10, actual: 4 }.kind(),
            ErrorKind::HttpError
        );
        assert_eq!(DownloadError::Disposed.kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_error_retryable() {
        assert!(DownloadError::RangeNotSatisfiable.kind().is_retryable());
        assert!(DownloadError::ModifiedSincePreviousDownload.kind().is_retryable());
        assert!(!DownloadError::ServerError(500).kind().is_retryable());
        assert!(!DownloadError::InvalidUrl("ftp://x".to_string()).kind().is_retryable());
    }

    #[test]
    fn test_classify_io() {
        let denied = io::Error::new(io::ErrorKind::PermissionDenied, "denied");
        assert_eq!(classify_io(&denied), ErrorKind::UnauthorizedFileAccess);

        let busy = io::Error::from_raw_os_error(SHARING_VIOLATION_CODES[0]);
        assert_eq!(classify_io(&busy), ErrorKind::SharingViolation);

        let other = io::Error::new(io::ErrorKind::Other, "disk on fire");
        assert_eq!(classify_io(&other), ErrorKind::Unknown);
        assert_eq!(DownloadError::IoError(other).kind(), ErrorKind::Unknown);
    }

    #[test]
    fn test_error_conversion() {
        let error: DownloadError = "测试错误".into();
        assert!(matches!(error, DownloadError::Unknown(_)));

        let error: DownloadError = "测试错误".to_string().into();
        assert!(matches!(error, DownloadError::Unknown(_)));
    }
}
