use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::error::{DownloadError, DownloadResult};

/// 解析远端地址：必须是绝对的 http/https URL
pub fn parse_remote_url(raw: &str) -> DownloadResult<Url> {
    let url = Url::parse(raw.trim()).map_err(|e| DownloadError::InvalidUrl(format!("{}: {}", raw, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DownloadError::InvalidUrl(format!("不支持的协议 {}: {}", other, raw))),
    }
}

/// 取 URL 最后一个路径段并做百分号解码，作为本地文件名
pub fn file_name_from_url(url: &Url) -> DownloadResult<String> {
    let segment = url
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    let decoded = urlencoding::decode(segment)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| segment.to_string());
    // 解码后可能出现分隔符
    let name = decoded.replace(['/', '\\'], "_");

    match name.trim() {
        "" | "." | ".." => Err(DownloadError::InvalidUrl(format!("无法从 URL 得到文件名: {}", url))),
        _ => Ok(name),
    }
}

/// URL 字符串的 SHA-256，小写十六进制
pub fn url_digest(url: &Url) -> String {
    let mut hasher = Sha256::new();
    hasher.update(url.as_str().as_bytes());
    format!("{:x}", hasher.finalize())
}

/// `<root>/<sha256(url)>/<文件名>`
pub fn local_path_for(root: &Path, url: &Url) -> DownloadResult<PathBuf> {
    let name = file_name_from_url(url)?;
    Ok(root.join(url_digest(url)).join(name))
}

/// 文件名最后一个点之后的部分，小写
pub fn extension_of(file_name: &str) -> Option<String> {
    let (stem, ext) = file_name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_remote_url() {
        assert!(parse_remote_url("https://example.com/ep1.mp3").is_ok());
        assert!(parse_remote_url("http://example.com/a/b.ogg").is_ok());
        assert!(matches!(parse_remote_url("ep1.mp3"), Err(DownloadError::InvalidUrl(_))));
        assert!(matches!(parse_remote_url("ftp://example.com/ep1.mp3"), Err(DownloadError::InvalidUrl(_))));
        assert!(matches!(parse_remote_url(""), Err(DownloadError::InvalidUrl(_))));
    }

    #[test]
    fn test_file_name_is_decoded() {
        let url = Url::parse("https://example.com/feed/My%20Episode%201.mp3?token=abc").unwrap();
        assert_eq!(file_name_from_url(&url).unwrap(), "My Episode 1.mp3");

        let url = Url::parse("https://example.com/a%2Fb.mp3").unwrap();
        assert_eq!(file_name_from_url(&url).unwrap(), "a_b.mp3");
    }

    #[test]
    fn test_file_name_rejects_empty_segments() {
        for raw in ["https://example.com/", "https://example.com", "https://example.com/dir/..", "https://example.com/%2E"] {
            let url = Url::parse(raw).unwrap();
            assert!(file_name_from_url(&url).is_err(), "{}", raw);
        }
    }

    #[test]
    fn test_digest_is_lowercase_hex() {
        let url = Url::parse("https://example.com/ep1.mp3").unwrap();
        let digest = url_digest(&url);
        assert_eq!(digest.len(), 64);
        assert!(digest.chars().all(|c| c.is_ascii_digit() || ('a'..='f').contains(&c)));
        assert_eq!(digest, url_digest(&url));

        let other = Url::parse("https://example.org/ep1.mp3").unwrap();
        assert_ne!(digest, url_digest(&other));
    }

    #[test]
    fn test_local_path_layout() {
        let url = Url::parse("https://example.com/ep1.mp3").unwrap();
        let path = local_path_for(Path::new("/tmp/pod"), &url).unwrap();
        assert_eq!(path, Path::new("/tmp/pod").join(url_digest(&url)).join("ep1.mp3"));
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("ep1.MP3").as_deref(), Some("mp3"));
        assert_eq!(extension_of("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension_of("README"), None);
        assert_eq!(extension_of(".hidden"), None);
        assert_eq!(extension_of("trailing."), None);
    }
}
