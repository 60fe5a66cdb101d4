//! 파일 기반 줄 소스
//!
//! 로그 파일을 감시하며 새로 추가되는 줄을 읽습니다.
//! `tail -f`와 유사한 동작을 비동기 방식으로 구현합니다.
//!
//! # 로테이션 감지
//! - inode 변경 감지 (logrotate 등) -- 새 파일을 처음부터 읽음
//! - 파일 크기 축소 감지 (truncation) -- 처음으로 되감음
//! - 파일 삭제 -- 다시 생길 때까지 재시도 후 처음부터 읽음

use std::io::SeekFrom;
use std::path::PathBuf;
use std::time::Duration;

use metrics::counter;
use playerwatch_core::metrics as m;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncSeekExt, BufReader};

use super::{LineSource, MAX_LINE_LENGTH, decode_line, read_limit};
use crate::error::TrackerError;

/// 파일 tail 소스
///
/// 처음 열 때는 파일 끝으로 이동하여 이미 기록된 내용은 건너뜁니다.
/// 로테이션이나 삭제 후 다시 열 때는 처음부터 읽습니다.
pub struct FileTail {
    path: PathBuf,
    poll_interval: Duration,
    reopen_backoff: Duration,
    reader: Option<BufReader<File>>,
    /// 현재 파일에서 소비한 바이트 수
    position: u64,
    inode: Option<u64>,
    /// 아직 줄바꿈을 만나지 못한 바이트
    buf: Vec<u8>,
    /// 최대 길이를 넘은 줄의 나머지를 버리는 중
    discarding: bool,
    from_start: bool,
}

impl FileTail {
    /// 새 파일 소스를 생성합니다.
    pub fn new(path: impl Into<PathBuf>, poll_interval: Duration, reopen_backoff: Duration) -> Self {
        Self {
            path: path.into(),
            poll_interval,
            reopen_backoff,
            reader: None,
            position: 0,
            inode: None,
            buf: Vec::new(),
            discarding: false,
            from_start: false,
        }
    }

    /// 파일이 열려 있는지 확인
    pub fn is_open(&self) -> bool {
        self.reader.is_some()
    }

    /// 다음 줄을 읽습니다.
    pub async fn next_line(&mut self) -> Result<Option<String>, TrackerError> {
        loop {
            if self.reader.is_none() {
                self.open().await;
            }
            let Some(reader) = self.reader.as_mut() else {
                continue;
            };

            let mut limited = reader.take(read_limit(self.buf.len()));
            let read = match limited.read_until(b'\n', &mut self.buf).await {
                Ok(read) => read,
                Err(e) => {
                    tracing::warn!(path = %self.path.display(), error = %e, "read failed, reopening");
                    self.reset();
                    return Ok(None);
                }
            };

            if read == 0 {
                self.on_eof().await;
                return Ok(None);
            }
            self.position += read as u64;

            if self.buf.last() != Some(&b'\n') {
                // 줄이 아직 완성되지 않음
                if self.buf.len() > MAX_LINE_LENGTH {
                    if !self.discarding {
                        tracing::warn!(
                            path = %self.path.display(),
                            max = MAX_LINE_LENGTH,
                            "line too long, discarding"
                        );
                    }
                    self.buf.clear();
                    self.discarding = true;
                }
                continue;
            }

            if self.discarding || self.buf.len() > MAX_LINE_LENGTH {
                if !self.discarding {
                    tracing::warn!(
                        path = %self.path.display(),
                        length = self.buf.len(),
                        max = MAX_LINE_LENGTH,
                        "line too long, discarding"
                    );
                }
                self.buf.clear();
                self.discarding = false;
                continue;
            }

            let line = decode_line(&self.buf);
            self.buf.clear();
            return Ok(Some(line));
        }
    }

    /// 파일이 열릴 때까지 재시도합니다.
    async fn open(&mut self) {
        let mut attempts: u64 = 0;
        loop {
            match self.try_open().await {
                Ok(()) => return,
                Err(e) => {
                    attempts += 1;
                    if attempts == 1 {
                        tracing::warn!(
                            path = %self.path.display(),
                            error = %e,
                            backoff_secs = self.reopen_backoff.as_secs_f64(),
                            "log file unavailable, retrying"
                        );
                    } else {
                        tracing::debug!(path = %self.path.display(), attempts, "log file still unavailable");
                    }
                    tokio::time::sleep(self.reopen_backoff).await;
                }
            }
        }
    }

    async fn try_open(&mut self) -> std::io::Result<()> {
        let mut file = File::open(&self.path).await?;
        let metadata = file.metadata().await?;
        let start = if self.from_start { 0 } else { metadata.len() };
        file.seek(SeekFrom::Start(start)).await?;

        self.reader = Some(BufReader::new(file));
        self.position = start;
        self.inode = file_id(&metadata);
        self.buf.clear();
        self.discarding = false;
        self.from_start = true;

        tracing::info!(path = %self.path.display(), offset = start, "log file opened");
        Ok(())
    }

    /// 파일 끝에서 로테이션 여부를 확인하고, 변화가 없으면 폴링 간격만큼 대기합니다.
    async fn on_eof(&mut self) {
        match tokio::fs::metadata(&self.path).await {
            Ok(metadata) => {
                if file_id(&metadata) != self.inode {
                    tracing::info!(path = %self.path.display(), "log file replaced, reopening from start");
                    self.reset();
                    return;
                }
                if metadata.len() < self.position {
                    tracing::info!(
                        path = %self.path.display(),
                        size = metadata.len(),
                        position = self.position,
                        "log file truncated, rewinding"
                    );
                    counter!(m::TRACKER_SOURCE_RESTARTS_TOTAL, m::LABEL_SOURCE => "file")
                        .increment(1);
                    if let Err(e) = self.rewind().await {
                        tracing::warn!(path = %self.path.display(), error = %e, "rewind failed, reopening");
                        self.reset();
                    }
                    return;
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!(path = %self.path.display(), "log file removed");
                self.reset();
                return;
            }
            Err(e) => {
                tracing::debug!(path = %self.path.display(), error = %e, "failed to stat log file");
            }
        }
        tokio::time::sleep(self.poll_interval).await;
    }

    async fn rewind(&mut self) -> std::io::Result<()> {
        if let Some(reader) = self.reader.as_mut() {
            reader.seek(SeekFrom::Start(0)).await?;
        }
        self.position = 0;
        self.buf.clear();
        self.discarding = false;
        Ok(())
    }

    /// 현재 파일을 닫고 다음 읽기에서 처음부터 다시 열게 합니다.
    fn reset(&mut self) {
        counter!(m::TRACKER_SOURCE_RESTARTS_TOTAL, m::LABEL_SOURCE => "file").increment(1);
        self.reader = None;
        self.buf.clear();
        self.discarding = false;
        self.from_start = true;
    }
}

impl LineSource for FileTail {
    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }

    async fn next_line(&mut self) -> Result<Option<String>, TrackerError> {
        FileTail::next_line(self).await
    }
}

#[cfg(unix)]
fn file_id(metadata: &std::fs::Metadata) -> Option<u64> {
    use std::os::unix::fs::MetadataExt;
    Some(metadata.ino())
}

#[cfg(not(unix))]
fn file_id(_metadata: &std::fs::Metadata) -> Option<u64> {
    None
}
