//! 배치 싱크 -- 버퍼, 타이머, 전송 디스패치를 하나의 생명주기로 묶습니다.
//!
//! [`BatchSink`]는 여러 스레드에서 들어오는 레코드를 고정 용량 버퍼에 모았다가
//! 버퍼가 가득 차거나 최대 지연이 지나면 하나의 blob으로 전송 계층에 넘깁니다.
//!
//! # 내부 아키텍처
//! ```text
//! producers --append()--> [Mutex<Inner>: RecordBuffer + FlushTimer]
//!                                   │ try_send (락 안에서 순서 확정)
//!                                   ▼
//!                         mpsc --> dispatch worker --> Transport (Async)
//!
//! close() --> worker drain --> final flush --> Transport (Sync) --> shutdown
//! ```
//!
//! 버퍼 변경, 플러시 판단, 타이머 재무장은 하나의 락 아래에서 일어납니다.
//! 전송 호출은 락 밖의 단일 워커 태스크가 대기열 순서대로 수행하므로
//! 느린 전송이 생산자 스레드를 막지 않고, 플러시 blob의 순서도 유지됩니다.
//!
//! 락을 잡은 동안에는 tracing 이벤트를 내지 않습니다. 싱크를 tracing fmt 레이어의
//! writer로 설치하면 이벤트가 다시 `append`로 들어오기 때문입니다.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use bytes::Bytes;
use serde::Serialize;
use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use logfunnel_core::metrics as m;

use crate::buffer::{Placement, RecordBuffer};
use crate::config::SinkConfig;
use crate::error::SinkError;
use crate::guard::{self, OversizeGuard};
use crate::scheduler::FlushTimer;
use crate::transport::{DestinationStatus, DispatchMode, Transport};

/// 싱크 생명주기 상태
///
/// `Created -> Running -> Draining -> Closed` 방향으로만 전이합니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SinkState {
    /// 생성됨, 타이머 무장 전
    Created,
    /// 레코드 수락 중
    Running,
    /// 종료 중 (타이머 취소됨, 마지막 플러시 진행)
    Draining,
    /// 종료됨
    Closed,
}

impl SinkState {
    /// 상태 이름을 반환합니다.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Running => "running",
            Self::Draining => "draining",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for SinkState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 플러시 원인
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushTrigger {
    /// 버퍼 공간 부족
    BufferFull,
    /// 최대 지연 경과
    TimerElapsed,
    /// 명시적 종료
    ExplicitClose,
}

impl FlushTrigger {
    /// 트리거에 대응하는 전송 방식을 반환합니다. 종료 플러시만 동기입니다.
    pub fn mode(&self) -> DispatchMode {
        match self {
            Self::BufferFull | Self::TimerElapsed => DispatchMode::Async,
            Self::ExplicitClose => DispatchMode::Sync,
        }
    }

    /// 메트릭 레이블 및 로그용 이름
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::BufferFull => "buffer_full",
            Self::TimerElapsed => "timer_elapsed",
            Self::ExplicitClose => "explicit_close",
        }
    }
}

impl fmt::Display for FlushTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// `append` 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    /// 버퍼에 담김
    Buffered,
    /// 기존 버퍼를 플러시한 뒤 빈 버퍼에 담김
    Flushed,
    /// 버퍼 용량보다 커서 단독 전송 대기열에 넣음
    Bypassed,
    /// 크기 한도 초과로 버려짐
    Rejected,
}

/// 싱크 통계 스냅샷
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SinkStats {
    /// 현재 상태
    pub state: SinkState,
    /// 수락된 레코드 수 (버퍼 + 우회)
    pub records_appended: u64,
    /// 크기 초과로 거부된 레코드 수
    pub records_rejected: u64,
    /// 비어 있지 않은 버퍼 플러시 수
    pub flushes: u64,
    /// 버퍼를 우회한 단독 전송 수
    pub bypass_dispatches: u64,
    /// 전송 시도 수
    pub dispatches: u64,
    /// 실패한 전송 수 (대기열 포화 포함)
    pub dispatch_failures: u64,
    /// 전송 완료된 바이트 수
    pub bytes_dispatched: u64,
    /// 현재 버퍼에 담긴 바이트 수
    pub buffered_bytes: usize,
}

#[derive(Default)]
struct SinkCounters {
    records_appended: AtomicU64,
    records_rejected: AtomicU64,
    flushes: AtomicU64,
    bypass_dispatches: AtomicU64,
    dispatches: AtomicU64,
    dispatch_failures: AtomicU64,
    bytes_dispatched: AtomicU64,
}

impl SinkCounters {
    fn bump(counter: &AtomicU64, by: u64) {
        counter.fetch_add(by, Ordering::Relaxed);
    }

    fn get(counter: &AtomicU64) -> u64 {
        counter.load(Ordering::Relaxed)
    }
}

/// blob의 출처
#[derive(Debug, Clone, Copy)]
enum DispatchOrigin {
    Flush(FlushTrigger),
    Bypass,
}

impl DispatchOrigin {
    fn mode(&self) -> DispatchMode {
        match self {
            Self::Flush(trigger) => trigger.mode(),
            Self::Bypass => DispatchMode::Async,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            Self::Flush(trigger) => trigger.as_str(),
            Self::Bypass => "bypass",
        }
    }
}

struct DispatchJob {
    batch_id: Uuid,
    payload: Bytes,
    origin: DispatchOrigin,
}

impl DispatchJob {
    fn new(payload: Bytes, origin: DispatchOrigin) -> Self {
        Self {
            batch_id: Uuid::new_v4(),
            payload,
            origin,
        }
    }
}

/// 대기열 투입 결과. 락을 푼 뒤 로그로 보고합니다.
struct Enqueued {
    batch_id: Uuid,
    origin: DispatchOrigin,
    bytes: usize,
    rejection: Option<&'static str>,
}

struct Inner {
    state: SinkState,
    buffer: RecordBuffer,
    timer: FlushTimer,
    dispatch_tx: Option<mpsc::Sender<DispatchJob>>,
    worker: Option<JoinHandle<()>>,
}

struct Shared<T: Transport> {
    config: SinkConfig,
    guard: OversizeGuard,
    transport: Arc<T>,
    runtime: Handle,
    counters: Arc<SinkCounters>,
    inner: Mutex<Inner>,
    this: Weak<Shared<T>>,
}

impl<T: Transport> Shared<T> {
    // 버퍼 불변식은 문장 사이에서 항상 유지되므로 poison 상태여도 계속 사용
    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn arm_timer(&self, inner: &mut Inner) {
        let this = self.this.clone();
        inner.timer.rearm(&self.runtime, move |generation| {
            if let Some(shared) = this.upgrade() {
                shared.on_timer(generation);
            }
        });
    }

    fn flush_job(&self, payload: Bytes, trigger: FlushTrigger) -> DispatchJob {
        SinkCounters::bump(&self.counters.flushes, 1);
        metrics::counter!(m::SINK_FLUSHES_TOTAL, m::LABEL_TRIGGER => trigger.as_str()).increment(1);
        DispatchJob::new(payload, DispatchOrigin::Flush(trigger))
    }

    fn enqueue(&self, inner: &Inner, job: DispatchJob) -> Enqueued {
        let mut enqueued = Enqueued {
            batch_id: job.batch_id,
            origin: job.origin,
            bytes: job.payload.len(),
            rejection: None,
        };

        let Some(tx) = inner.dispatch_tx.as_ref() else {
            enqueued.rejection = Some("dispatch worker is not running");
            return enqueued;
        };
        match tx.try_send(job) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => enqueued.rejection = Some("dispatch queue is full"),
            Err(TrySendError::Closed(_)) => {
                enqueued.rejection = Some("dispatch worker has stopped");
            }
        }
        enqueued
    }

    fn report(&self, enqueued: Enqueued) {
        match enqueued.rejection {
            None => debug!(
                sink = %self.config.name,
                destination = %self.config.destination,
                batch_id = %enqueued.batch_id,
                trigger = enqueued.origin.as_str(),
                bytes = enqueued.bytes,
                "blob queued for dispatch"
            ),
            Some(reason) => {
                SinkCounters::bump(&self.counters.dispatches, 1);
                SinkCounters::bump(&self.counters.dispatch_failures, 1);
                metrics::counter!(m::SINK_DISPATCHES_TOTAL, m::LABEL_RESULT => "failure")
                    .increment(1);
                error!(
                    sink = %self.config.name,
                    destination = %self.config.destination,
                    batch_id = %enqueued.batch_id,
                    trigger = enqueued.origin.as_str(),
                    bytes = enqueued.bytes,
                    reason,
                    "blob dropped before dispatch"
                );
            }
        }
    }

    fn append(&self, record: &[u8]) -> Result<AppendOutcome, SinkError> {
        let mut inner = self.lock();
        // 닫힌 뒤의 호출은 로그 없이 에러만 반환 (SinkWriter 경유 시 재귀 방지)
        if inner.state != SinkState::Running {
            return Err(SinkError::Lifecycle { state: inner.state });
        }

        if let Err(err) = self.guard.check(record) {
            drop(inner);
            SinkCounters::bump(&self.counters.records_rejected, 1);
            metrics::counter!(m::SINK_RECORDS_REJECTED_TOTAL).increment(1);
            error!(
                sink = %self.config.name,
                destination = %self.config.destination,
                bytes = record.len(),
                max = self.guard.max_record_bytes(),
                preview = %guard::preview(record),
                error = %err,
                "record discarded"
            );
            return Ok(AppendOutcome::Rejected);
        }

        SinkCounters::bump(&self.counters.records_appended, 1);
        metrics::counter!(m::SINK_RECORDS_APPENDED_TOTAL).increment(1);

        let mut reports = Vec::new();
        let outcome = match inner.buffer.place(record) {
            Placement::Buffered => AppendOutcome::Buffered,
            Placement::Overflow { flushed, bypass } => {
                self.arm_timer(&mut inner);
                if let Some(payload) = flushed {
                    let job = self.flush_job(payload, FlushTrigger::BufferFull);
                    reports.push(self.enqueue(&inner, job));
                }
                match bypass {
                    Some(payload) => {
                        SinkCounters::bump(&self.counters.bypass_dispatches, 1);
                        metrics::counter!(m::SINK_BYPASS_DISPATCHES_TOTAL).increment(1);
                        let job = DispatchJob::new(payload, DispatchOrigin::Bypass);
                        reports.push(self.enqueue(&inner, job));
                        AppendOutcome::Bypassed
                    }
                    None => AppendOutcome::Flushed,
                }
            }
        };
        metrics::gauge!(m::SINK_BUFFERED_BYTES).set(inner.buffer.position() as f64);
        drop(inner);

        for enqueued in reports {
            self.report(enqueued);
        }
        Ok(outcome)
    }

    fn on_timer(&self, generation: u64) {
        let mut inner = self.lock();
        if inner.state != SinkState::Running || !inner.timer.is_current(generation) {
            return;
        }

        let flushed = inner.buffer.take();
        self.arm_timer(&mut inner);
        let report = flushed.map(|payload| {
            let job = self.flush_job(payload, FlushTrigger::TimerElapsed);
            self.enqueue(&inner, job)
        });
        metrics::gauge!(m::SINK_BUFFERED_BYTES).set(0.0);
        drop(inner);

        match report {
            Some(enqueued) => self.report(enqueued),
            None => debug!(sink = %self.config.name, "flush timer elapsed, buffer empty"),
        }
    }

    async fn close(&self) {
        let (final_blob, dispatch_tx, worker) = {
            let mut inner = self.lock();
            if matches!(inner.state, SinkState::Draining | SinkState::Closed) {
                return;
            }
            inner.state = SinkState::Draining;
            inner.timer.cancel();
            (
                inner.buffer.take(),
                inner.dispatch_tx.take(),
                inner.worker.take(),
            )
        };
        metrics::gauge!(m::SINK_BUFFERED_BYTES).set(0.0);

        info!(
            sink = %self.config.name,
            destination = %self.config.destination,
            pending_bytes = final_blob.as_ref().map_or(0, Bytes::len),
            "closing sink"
        );

        // 송신측을 닫으면 워커는 남은 대기열을 모두 처리한 뒤 종료
        drop(dispatch_tx);
        if let Some(worker) = worker {
            if let Err(e) = worker.await {
                warn!(sink = %self.config.name, error = %e, "dispatch worker ended abnormally");
            }
        }

        if let Some(payload) = final_blob {
            let job = self.flush_job(payload, FlushTrigger::ExplicitClose);
            dispatch(
                self.transport.as_ref(),
                &self.counters,
                &self.config.destination,
                job,
            )
            .await;
        }

        self.transport.shutdown().await;
        self.lock().state = SinkState::Closed;
        info!(sink = %self.config.name, "sink closed");
    }

    fn stats(&self) -> SinkStats {
        let (state, buffered_bytes) = {
            let inner = self.lock();
            (inner.state, inner.buffer.position())
        };
        let c = &self.counters;
        SinkStats {
            state,
            records_appended: SinkCounters::get(&c.records_appended),
            records_rejected: SinkCounters::get(&c.records_rejected),
            flushes: SinkCounters::get(&c.flushes),
            bypass_dispatches: SinkCounters::get(&c.bypass_dispatches),
            dispatches: SinkCounters::get(&c.dispatches),
            dispatch_failures: SinkCounters::get(&c.dispatch_failures),
            bytes_dispatched: SinkCounters::get(&c.bytes_dispatched),
            buffered_bytes,
        }
    }
}

impl<T: Transport> Drop for Shared<T> {
    fn drop(&mut self) {
        let inner = self.inner.get_mut().unwrap_or_else(PoisonError::into_inner);
        if inner.state == SinkState::Running && !inner.buffer.is_empty() {
            warn!(
                sink = %self.config.name,
                destination = %self.config.destination,
                lost_bytes = inner.buffer.position(),
                "sink dropped without close, buffered records are lost"
            );
        }
    }
}

/// blob 하나를 전송하고 결과를 기록합니다. 에러는 호출자에게 전파하지 않습니다.
async fn dispatch<T: Transport>(
    transport: &T,
    counters: &SinkCounters,
    destination: &str,
    job: DispatchJob,
) {
    let bytes = job.payload.len();
    let mode = job.origin.mode();
    SinkCounters::bump(&counters.dispatches, 1);

    match transport.dispatch(job.payload, mode).await {
        Ok(()) => {
            SinkCounters::bump(&counters.bytes_dispatched, bytes as u64);
            metrics::counter!(m::SINK_DISPATCHES_TOTAL, m::LABEL_RESULT => "success").increment(1);
            metrics::counter!(m::SINK_BYTES_DISPATCHED_TOTAL).increment(bytes as u64);
            debug!(
                destination,
                batch_id = %job.batch_id,
                trigger = job.origin.as_str(),
                bytes,
                %mode,
                "blob dispatched"
            );
        }
        Err(e) => {
            SinkCounters::bump(&counters.dispatch_failures, 1);
            metrics::counter!(m::SINK_DISPATCHES_TOTAL, m::LABEL_RESULT => "failure").increment(1);
            error!(
                destination,
                batch_id = %job.batch_id,
                trigger = job.origin.as_str(),
                bytes,
                %mode,
                error = %e,
                "failed to dispatch blob"
            );
        }
    }
}

async fn run_dispatch_worker<T: Transport>(
    transport: Arc<T>,
    counters: Arc<SinkCounters>,
    destination: String,
    mut rx: mpsc::Receiver<DispatchJob>,
) {
    while let Some(job) = rx.recv().await {
        dispatch(transport.as_ref(), &counters, &destination, job).await;
    }
    debug!(destination = %destination, "dispatch worker stopped");
}

/// 배치 싱크
///
/// 복제본은 같은 버퍼와 타이머를 공유합니다. 마지막 복제본이 `close()` 없이
/// 버려지면 버퍼에 남은 레코드는 전송되지 않습니다.
///
/// # 사용 예시
/// ```ignore
/// use logfunnel_sink::{BatchSinkBuilder, FileTransport, SinkConfigBuilder};
///
/// let config = SinkConfigBuilder::new("app-logs").build()?;
/// let transport = FileTransport::new("/tmp/streams", &config.region, &config.destination, 3, backoff);
/// let sink = BatchSinkBuilder::new(config, transport).build().await?;
///
/// sink.append(b"hello\n")?;
/// sink.close().await;
/// ```
pub struct BatchSink<T: Transport> {
    shared: Arc<Shared<T>>,
}

impl<T: Transport> Clone for BatchSink<T> {
    fn clone(&self) -> Self {
        Self {
            shared: Arc::clone(&self.shared),
        }
    }
}

impl<T: Transport> BatchSink<T> {
    /// 레코드 하나를 추가합니다.
    ///
    /// 어느 스레드에서든 호출할 수 있으며 전송 I/O를 기다리지 않습니다.
    /// 크기 초과와 전송 실패는 로그로 보고되고 호출자에게 전파되지 않습니다.
    ///
    /// # Errors
    ///
    /// 싱크가 실행 중이 아니면 [`SinkError::Lifecycle`]을 반환합니다.
    pub fn append(&self, record: &[u8]) -> Result<AppendOutcome, SinkError> {
        self.shared.append(record)
    }

    /// 텍스트 레코드를 설정된 문자셋으로 인코딩하여 추가합니다.
    pub fn append_str(&self, text: &str) -> Result<AppendOutcome, SinkError> {
        let encoded = self.shared.config.charset.encode(text);
        self.shared.append(&encoded)
    }

    /// 싱크를 닫습니다.
    ///
    /// 타이머를 취소하고, 대기 중인 비동기 전송을 모두 처리한 뒤, 남은 버퍼를
    /// 동기 전송하고 전송 계층을 해제합니다. 두 번째 호출부터는 아무 일도 하지 않습니다.
    pub async fn close(&self) {
        self.shared.close().await;
    }

    /// 현재 상태를 반환합니다.
    pub fn state(&self) -> SinkState {
        self.shared.lock().state
    }

    /// 현재 버퍼에 담긴 바이트 수를 반환합니다.
    pub fn buffered_bytes(&self) -> usize {
        self.shared.lock().buffer.position()
    }

    /// 통계 스냅샷을 반환합니다.
    pub fn stats(&self) -> SinkStats {
        self.shared.stats()
    }

    /// 싱크 설정을 반환합니다.
    pub fn config(&self) -> &SinkConfig {
        &self.shared.config
    }
}

/// 배치 싱크 빌더
pub struct BatchSinkBuilder<T: Transport> {
    config: SinkConfig,
    transport: T,
    guard: OversizeGuard,
}

impl<T: Transport> BatchSinkBuilder<T> {
    /// 설정과 전송 구현으로 새 빌더를 생성합니다.
    pub fn new(config: SinkConfig, transport: T) -> Self {
        Self {
            config,
            transport,
            guard: OversizeGuard::default(),
        }
    }

    /// 단일 레코드 크기 한도를 바꿉니다 (기본 1000 KB).
    pub fn max_record_bytes(mut self, max: usize) -> Self {
        self.guard = OversizeGuard::new(max);
        self
    }

    /// 대상 스트림 상태를 확인하고 싱크를 시작합니다.
    ///
    /// # Errors
    ///
    /// - [`SinkError::Config`]: tokio 런타임 밖에서 호출됨
    /// - [`SinkError::DestinationNotReady`]: 대상이 활성 상태가 아니거나 조회 실패
    pub async fn build(self) -> Result<BatchSink<T>, SinkError> {
        let Self {
            config,
            transport,
            guard,
        } = self;

        let runtime = Handle::try_current().map_err(|e| SinkError::Config {
            field: "runtime".to_owned(),
            reason: format!("a tokio runtime is required: {e}"),
        })?;

        let not_ready = |reason: String| SinkError::DestinationNotReady {
            sink: config.name.clone(),
            destination: config.destination.clone(),
            reason,
        };
        match transport.status().await {
            Ok(DestinationStatus::Active) => {}
            Ok(status) => {
                return Err(not_ready(format!(
                    "destination status is {status}, it must be active"
                )));
            }
            Err(e) => {
                return Err(not_ready(format!("destination does not exist: {e}")));
            }
        }

        let transport = Arc::new(transport);
        let counters = Arc::new(SinkCounters::default());
        let (dispatch_tx, dispatch_rx) = mpsc::channel(config.dispatch_queue_capacity);
        let worker = runtime.spawn(run_dispatch_worker(
            Arc::clone(&transport),
            Arc::clone(&counters),
            config.destination.clone(),
            dispatch_rx,
        ));

        let buffer = RecordBuffer::new(config.buffer_capacity());
        let timer = FlushTimer::new(config.max_put_record_delay());
        let shared = Arc::new_cyclic(|this| Shared {
            config,
            guard,
            transport,
            runtime,
            counters,
            inner: Mutex::new(Inner {
                state: SinkState::Created,
                buffer,
                timer,
                dispatch_tx: Some(dispatch_tx),
                worker: Some(worker),
            }),
            this: this.clone(),
        });

        let delay = {
            let mut inner = shared.lock();
            shared.arm_timer(&mut inner);
            inner.state = SinkState::Running;
            inner.timer.delay()
        };

        info!(
            sink = %shared.config.name,
            destination = %shared.config.destination,
            region = %shared.config.region,
            buffer_bytes = shared.config.buffer_capacity(),
            delay_secs = delay.as_secs(),
            "batch sink started"
        );

        Ok(BatchSink { shared })
    }
}
