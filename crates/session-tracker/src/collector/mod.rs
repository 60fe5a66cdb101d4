//! 줄 수집 모듈 -- 추적기가 소비할 로그 줄을 한 줄씩 공급합니다.
//!
//! # 수집 소스
//! - [`FileTail`]: 파일 감시 (`tail -f` 방식, 로테이션/truncation 감지)
//! - [`ProcessStream`]: 하위 프로세스 표준 출력 (예: `docker logs -f`)
//!
//! # 동작 규약
//! [`LineSource::next_line`]은 다음 줄을 반환하거나, 아직 줄이 없으면
//! 폴링 간격만큼 대기한 뒤 `Ok(None)`을 반환합니다.
//! 소스를 사용할 수 없는 동안(파일 없음, 실행 실패)에는 내부에서 재시도하며
//! 반환하지 않습니다.

pub mod file;
pub mod process;

pub use file::FileTail;
pub use process::ProcessStream;

use std::future::Future;
use std::time::Duration;

use crate::config::SourceSpec;
use crate::error::TrackerError;

/// 한 줄 최대 길이 (바이트). 초과하는 줄은 경고 후 버립니다.
pub const MAX_LINE_LENGTH: usize = 64 * 1024; // 64KB

/// 한 번의 읽기에서 버퍼에 추가할 수 있는 최대 바이트 수
///
/// 버퍼가 `MAX_LINE_LENGTH`를 한 바이트 넘는 지점까지만 읽습니다.
pub(crate) fn read_limit(buffered: usize) -> u64 {
    (MAX_LINE_LENGTH + 1).saturating_sub(buffered).max(1) as u64
}

/// 줄 소스 trait
///
/// 추적기 제어 루프가 `tokio::select!` 안에서 호출하므로
/// 구현체는 취소되어도 읽던 줄을 잃지 않아야 합니다.
pub trait LineSource: Send {
    /// 로그/메트릭용 소스 설명
    fn describe(&self) -> String;

    /// 다음 줄을 읽습니다. 줄 끝의 `\n`, `\r\n`은 제거됩니다.
    fn next_line(&mut self) -> impl Future<Output = Result<Option<String>, TrackerError>> + Send;
}

/// 설정에서 생성되는 소스
pub enum AnySource {
    /// 파일 tail
    File(FileTail),
    /// 하위 프로세스
    Process(ProcessStream),
}

impl AnySource {
    /// 소스 명세로부터 소스를 생성합니다. 실제 열기/실행은 첫 읽기 시점에 합니다.
    pub fn from_spec(spec: &SourceSpec, poll_interval: Duration, reopen_backoff: Duration) -> Self {
        match spec {
            SourceSpec::File { path } => {
                Self::File(FileTail::new(path.clone(), poll_interval, reopen_backoff))
            }
            SourceSpec::Process { program, args } => Self::Process(ProcessStream::new(
                program.clone(),
                args.clone(),
                poll_interval,
                reopen_backoff,
            )),
        }
    }
}

impl LineSource for AnySource {
    fn describe(&self) -> String {
        match self {
            Self::File(source) => source.describe(),
            Self::Process(source) => source.describe(),
        }
    }

    async fn next_line(&mut self) -> Result<Option<String>, TrackerError> {
        match self {
            Self::File(source) => source.next_line().await,
            Self::Process(source) => source.next_line().await,
        }
    }
}

/// 완성된 줄 버퍼를 문자열로 변환합니다.
///
/// 잘못된 UTF-8 바이트는 대체 문자로 바뀝니다.
pub(crate) fn decode_line(buf: &[u8]) -> String {
    let mut end = buf.len();
    while end > 0 && matches!(buf[end - 1], b'\n' | b'\r') {
        end -= 1;
    }
    String::from_utf8_lossy(&buf[..end]).into_owned()
}
