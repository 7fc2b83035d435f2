use anyhow::Result;
use url::Url;

/// 只接受绝对的 http/https 地址
pub fn is_valid_url(url: &str) -> bool {
    Url::parse(url.trim())
        .map(|u| matches!(u.scheme(), "http" | "https") && u.has_host())
        .unwrap_or(false)
}

pub fn validate_concurrency(count: usize) -> Result<()> {
    if count == 0 {
        anyhow::bail!("并发数必须大于0");
    }
    if count > 32 {
        anyhow::bail!("并发数不能超过32");
    }
    Ok(())
}

pub fn validate_urls(urls: &[String]) -> Result<()> {
    if urls.is_empty() {
        anyhow::bail!("URL列表不能为空");
    }
    if let Some(bad) = urls.iter().find(|u| !is_valid_url(u)) {
        anyhow::bail!("无效的URL: {}", bad);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_validation() {
        assert!(is_valid_url("https://example.com/ep1.mp3"));
        assert!(is_valid_url("http://example.com"));
        assert!(!is_valid_url("ftp://example.com/ep1.mp3"));
        assert!(!is_valid_url("invalid-url"));
    }

    #[test]
    fn test_concurrency_validation() {
        assert!(validate_concurrency(1).is_ok());
        assert!(validate_concurrency(32).is_ok());
        assert!(validate_concurrency(0).is_err());
        assert!(validate_concurrency(33).is_err());
    }

    #[test]
    fn test_urls_validation() {
        let valid_urls = vec![
            "https://example.com/a.mp3".to_string(),
            "http://example.com/b.mp3".to_string(),
        ];
        assert!(validate_urls(&valid_urls).is_ok());

        let invalid_urls = vec!["invalid-url".to_string(), "https://example.com".to_string()];
        assert!(validate_urls(&invalid_urls).is_err());
        assert!(validate_urls(&[]).is_err());
    }
}
