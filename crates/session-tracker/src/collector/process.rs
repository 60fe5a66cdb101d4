//! 하위 프로세스 줄 소스
//!
//! 외부 프로그램(기본: `docker logs --since 1s -f <container>`)을 실행하고
//! 표준 출력을 한 줄씩 읽습니다. 프로세스가 종료되면 다시 실행합니다.

use std::process::Stdio;
use std::time::Duration;

use metrics::counter;
use playerwatch_core::metrics as m;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStdout, Command};

use super::{LineSource, MAX_LINE_LENGTH, decode_line, read_limit};
use crate::error::TrackerError;

/// 하위 프로세스 소스
///
/// 프로세스 핸들은 이 소스만 소유하며, 소스가 drop되면 프로세스도 종료됩니다.
pub struct ProcessStream {
    program: String,
    args: Vec<String>,
    poll_interval: Duration,
    reopen_backoff: Duration,
    child: Option<Child>,
    reader: Option<BufReader<ChildStdout>>,
    buf: Vec<u8>,
    discarding: bool,
    lines_since_launch: u64,
    /// 다음 실행 전 대기 시간
    relaunch_delay: Option<Duration>,
}

impl ProcessStream {
    /// 새 프로세스 소스를 생성합니다.
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        poll_interval: Duration,
        reopen_backoff: Duration,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            poll_interval,
            reopen_backoff,
            child: None,
            reader: None,
            buf: Vec::new(),
            discarding: false,
            lines_since_launch: 0,
            relaunch_delay: None,
        }
    }

    /// 프로세스가 실행 중인지 확인
    pub fn is_running(&self) -> bool {
        self.reader.is_some()
    }

    /// 다음 줄을 읽습니다.
    ///
    /// 프로세스가 살아 있지만 출력이 없으면 폴링 간격 후 `Ok(None)`을 반환합니다.
    pub async fn next_line(&mut self) -> Result<Option<String>, TrackerError> {
        loop {
            if self.reader.is_none() {
                self.launch().await;
            }
            let Some(reader) = self.reader.as_mut() else {
                continue;
            };

            let mut limited = reader.take(read_limit(self.buf.len()));
            let read = tokio::time::timeout(
                self.poll_interval,
                limited.read_until(b'\n', &mut self.buf),
            )
            .await;

            match read {
                Err(_) => {
                    if self.buf.len() > MAX_LINE_LENGTH {
                        self.drop_overlong();
                    }
                    return Ok(None);
                }
                Ok(Ok(0)) => {
                    // 줄바꿈 없이 끝난 마지막 출력
                    let rest = if self.buf.is_empty() || self.discarding {
                        None
                    } else {
                        Some(decode_line(&self.buf))
                    };
                    self.buf.clear();
                    self.discarding = false;
                    self.on_exit().await;
                    return Ok(rest);
                }
                Ok(Ok(_)) => {
                    if self.buf.last() != Some(&b'\n') {
                        if self.buf.len() > MAX_LINE_LENGTH {
                            self.drop_overlong();
                        }
                        continue;
                    }
                    if self.discarding || self.buf.len() > MAX_LINE_LENGTH {
                        if !self.discarding {
                            self.drop_overlong();
                        }
                        self.buf.clear();
                        self.discarding = false;
                        continue;
                    }
                    let line = decode_line(&self.buf);
                    self.buf.clear();
                    self.lines_since_launch += 1;
                    return Ok(Some(line));
                }
                Ok(Err(e)) => {
                    tracing::warn!(source = %self.describe(), error = %e, "read failed, restarting process");
                    self.stop().await;
                    self.relaunch_delay = Some(self.reopen_backoff);
                    return Ok(None);
                }
            }
        }
    }

    fn drop_overlong(&mut self) {
        if !self.discarding {
            tracing::warn!(
                source = %self.describe(),
                max = MAX_LINE_LENGTH,
                "line too long, discarding"
            );
        }
        self.buf.clear();
        self.discarding = true;
    }

    /// 프로세스가 실행될 때까지 재시도합니다.
    async fn launch(&mut self) {
        if let Some(delay) = self.relaunch_delay.take() {
            tokio::time::sleep(delay).await;
        }
        loop {
            match self.spawn() {
                Ok(pid) => {
                    tracing::info!(source = %self.describe(), pid, "process started");
                    return;
                }
                Err(e) => {
                    tracing::error!(
                        source = %self.describe(),
                        error = %e,
                        backoff_secs = self.reopen_backoff.as_secs_f64(),
                        "failed to start process, retrying"
                    );
                    tokio::time::sleep(self.reopen_backoff).await;
                }
            }
        }
    }

    fn spawn(&mut self) -> std::io::Result<u32> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| std::io::Error::other("stdout not captured"))?;
        let pid = child.id().unwrap_or_default();

        self.reader = Some(BufReader::new(stdout));
        self.child = Some(child);
        self.buf.clear();
        self.discarding = false;
        self.lines_since_launch = 0;
        Ok(pid)
    }

    /// 종료된 프로세스를 회수하고 재실행을 예약합니다.
    ///
    /// 아무 줄도 내지 않고 끝난 프로세스는 재실행 대기 시간을 늘려 빠른 반복을 막습니다.
    async fn on_exit(&mut self) {
        self.reader = None;
        if let Some(mut child) = self.child.take() {
            match child.wait().await {
                Ok(status) => tracing::warn!(
                    source = %self.describe(),
                    status = %status,
                    lines = self.lines_since_launch,
                    "process exited, relaunching"
                ),
                Err(e) => tracing::warn!(source = %self.describe(), error = %e, "failed to reap process"),
            }
        }
        counter!(m::TRACKER_SOURCE_RESTARTS_TOTAL, m::LABEL_SOURCE => "process").increment(1);
        self.relaunch_delay = Some(if self.lines_since_launch == 0 {
            self.reopen_backoff
        } else {
            self.poll_interval
        });
    }

    async fn stop(&mut self) {
        self.reader = None;
        self.buf.clear();
        self.discarding = false;
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.kill().await {
                tracing::debug!(source = %self.describe(), error = %e, "failed to kill process");
            }
        }
        counter!(m::TRACKER_SOURCE_RESTARTS_TOTAL, m::LABEL_SOURCE => "process").increment(1);
    }
}

impl LineSource for ProcessStream {
    fn describe(&self) -> String {
        format!("process:{} {}", self.program, self.args.join(" "))
    }

    async fn next_line(&mut self) -> Result<Option<String>, TrackerError> {
        ProcessStream::next_line(self).await
    }
}
