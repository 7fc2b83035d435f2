use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::time::SystemTime;

/// 本地目标文件的写入器
///
/// 文件已存在时以追加方式打开，`offset` 即续传偏移。
pub struct FileSink {
    writer: BufWriter<File>,
    offset: u64,
    total_written: u64,
    modified: Option<SystemTime>,
}

impl FileSink {
    /// 打开（必要时创建）本地文件，目录按需创建
    pub fn open(path: &Path, buffer_size: usize) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        let metadata = file.metadata()?;
        let offset = metadata.len();
        let modified = if offset > 0 { metadata.modified().ok() } else { None };

        Ok(Self {
            writer: BufWriter::with_capacity(buffer_size.max(1), file),
            offset,
            total_written: 0,
            modified,
        })
    }

    /// 打开时文件已有的字节数
    pub fn offset(&self) -> u64 {
        self.offset
    }

    /// 打开时部分文件的最后写入时间
    pub fn modified(&self) -> Option<SystemTime> {
        self.modified
    }

    /// 当前文件逻辑长度（含缓冲区中未落盘的数据）
    pub fn position(&self) -> u64 {
        self.offset + self.total_written
    }

    pub fn write(&mut self, data: &[u8]) -> io::Result<()> {
        self.writer.write_all(data)?;
        self.total_written += data.len() as u64;
        Ok(())
    }

    /// 丢弃已有内容，从头写入
    pub fn truncate(&mut self) -> io::Result<()> {
        self.writer.flush()?;
        self.writer.get_ref().set_len(0)?;
        self.offset = 0;
        self.total_written = 0;
        self.modified = None;
        Ok(())
    }

    /// 刷新并关闭文件，返回最终长度
    pub fn close(mut self) -> io::Result<u64> {
        self.writer.flush()?;
        Ok(self.position())
    }
}

/// 删除部分文件；若所在的按 URL 划分的目录因此变空，一并删除
pub fn remove_partial(path: &Path) -> io::Result<()> {
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }
    if let Some(parent) = path.parent() {
        // 目录非空时 remove_dir 失败，属于预期情况
        let _ = fs::remove_dir(parent);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abc").join("ep1.mp3");

        let mut sink = FileSink::open(&path, 16).unwrap();
        assert_eq!(sink.offset(), 0);
        assert!(sink.modified().is_none());

        let payload = vec![9u8; 40];
        sink.write(&payload).unwrap();
        assert_eq!(sink.close().unwrap(), 40);
        assert_eq!(fs::read(&path).unwrap(), payload);
    }

    #[test]
    fn test_append_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ep2.mp3");
        fs::write(&path, vec![7u8; 1000]).unwrap();

        let mut sink = FileSink::open(&path, 1024).unwrap();
        assert_eq!(sink.offset(), 1000);
        assert!(sink.modified().is_some());

        sink.write(&[1, 2, 3]).unwrap();
        assert_eq!(sink.position(), 1003);
        sink.close().unwrap();

        let data = fs::read(&path).unwrap();
        assert_eq!(data.len(), 1003);
        assert_eq!(&data[1000..], &[1, 2, 3]);
    }

    #[test]
    fn test_truncate_restarts_from_zero() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ep3.mp3");
        fs::write(&path, b"stale partial").unwrap();

        let mut sink = FileSink::open(&path, 4).unwrap();
        sink.truncate().unwrap();
        sink.write(b"fresh").unwrap();
        assert_eq!(sink.close().unwrap(), 5);
        assert_eq!(fs::read(&path).unwrap(), b"fresh");
    }

    #[test]
    fn test_remove_partial_cleans_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let url_dir = dir.path().join("digest");
        let path = url_dir.join("ep4.mp3");
        fs::create_dir_all(&url_dir).unwrap();
        fs::write(&path, b"partial").unwrap();

        remove_partial(&path).unwrap();
        assert!(!path.exists());
        assert!(!url_dir.exists());

        // 不存在的文件视为已清理
        remove_partial(&path).unwrap();
    }

    #[test]
    fn test_remove_partial_keeps_non_empty_dir() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("ep5.mp3");
        fs::write(&path, b"partial").unwrap();
        fs::write(dir.path().join("other"), b"x").unwrap();

        remove_partial(&path).unwrap();
        assert!(!path.exists());
        assert!(dir.path().exists());
    }
}
