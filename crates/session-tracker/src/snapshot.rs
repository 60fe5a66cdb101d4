//! 스냅샷 기록/읽기
//!
//! 활성 세션 목록을 들여쓰기 2칸의 JSON 배열로 기록합니다.
//! 임시 파일(`<path>.tmp`)에 먼저 쓰고 `rename`으로 교체하므로
//! 읽는 쪽은 항상 완전한 문서를 보게 됩니다.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use metrics::counter;
use playerwatch_core::metrics as m;
use playerwatch_core::types::ActiveSession;

use crate::error::TrackerError;

/// 스냅샷 기록기
#[derive(Debug, Clone)]
pub struct SnapshotWriter {
    path: PathBuf,
    tmp_path: PathBuf,
}

impl SnapshotWriter {
    /// 새 기록기를 생성합니다.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let mut tmp = path.clone().into_os_string();
        tmp.push(".tmp");
        Self {
            path,
            tmp_path: PathBuf::from(tmp),
        }
    }

    /// 스냅샷 경로
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 세션 목록을 기록합니다.
    pub fn write(&self, sessions: &[ActiveSession]) -> Result<(), TrackerError> {
        let snapshot_err = |reason: String| TrackerError::Snapshot {
            path: self.path.display().to_string(),
            reason,
        };

        let mut body = serde_json::to_vec_pretty(sessions)
            .map_err(|e| snapshot_err(format!("serialize failed: {e}")))?;
        body.push(b'\n');

        let mut file = fs::File::create(&self.tmp_path)
            .map_err(|e| snapshot_err(format!("create temp file failed: {e}")))?;
        file.write_all(&body)
            .map_err(|e| snapshot_err(format!("write failed: {e}")))?;
        file.sync_all()
            .map_err(|e| snapshot_err(format!("sync failed: {e}")))?;
        drop(file);

        fs::rename(&self.tmp_path, &self.path)
            .map_err(|e| snapshot_err(format!("rename failed: {e}")))?;
        Ok(())
    }

    /// 세션 목록을 기록하고 실패는 로그로만 남깁니다.
    ///
    /// 성공 여부를 반환합니다. 실패해도 이전 파일은 그대로 남습니다.
    pub fn write_logged(&self, sessions: &[ActiveSession]) -> bool {
        match self.write(sessions) {
            Ok(()) => {
                counter!(m::TRACKER_SNAPSHOT_WRITES_TOTAL, m::LABEL_RESULT => "success")
                    .increment(1);
                tracing::debug!(
                    path = %self.path.display(),
                    active = sessions.len(),
                    "snapshot written"
                );
                true
            }
            Err(e) => {
                counter!(m::TRACKER_SNAPSHOT_WRITES_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                tracing::error!(error = %e, "failed to write snapshot");
                false
            }
        }
    }
}

/// 스냅샷 파일을 읽습니다.
///
/// 파일이 없거나 비어 있거나 손상된 경우 빈 목록을 반환합니다.
pub fn read_snapshot(path: impl AsRef<Path>) -> Vec<ActiveSession> {
    let path = path.as_ref();
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) => {
            if e.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!(path = %path.display(), error = %e, "failed to read snapshot");
            }
            return Vec::new();
        }
    };

    if content.trim().is_empty() {
        return Vec::new();
    }

    serde_json::from_str(&content).unwrap_or_else(|e| {
        tracing::warn!(path = %path.display(), error = %e, "snapshot is not valid JSON");
        Vec::new()
    })
}
