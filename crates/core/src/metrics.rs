//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 싱크는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `logfunnel_`
//! - 구성 요소명: `sink_`
//! - 접미어: `_total` (counter), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use logfunnel_core::metrics as m;
//!
//! metrics::counter!(m::SINK_RECORDS_APPENDED_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 플러시 트리거 레이블 키 (buffer_full, timer_elapsed, explicit_close)
pub const LABEL_TRIGGER: &str = "trigger";

/// 전송 결과 레이블 키 (success, failure)
pub const LABEL_RESULT: &str = "result";

// ─── Sink 메트릭 ────────────────────────────────────────────────────

/// Sink: 버퍼 또는 우회 경로로 수락된 레코드 수 (counter)
pub const SINK_RECORDS_APPENDED_TOTAL: &str = "logfunnel_sink_records_appended_total";

/// Sink: 크기 초과로 거부된 레코드 수 (counter)
pub const SINK_RECORDS_REJECTED_TOTAL: &str = "logfunnel_sink_records_rejected_total";

/// Sink: 버퍼 플러시 수 (counter, label: trigger)
pub const SINK_FLUSHES_TOTAL: &str = "logfunnel_sink_flushes_total";

/// Sink: 버퍼를 우회하여 단독 전송된 레코드 수 (counter)
pub const SINK_BYPASS_DISPATCHES_TOTAL: &str = "logfunnel_sink_bypass_dispatches_total";

/// Sink: 전송 시도 수 (counter, label: result)
pub const SINK_DISPATCHES_TOTAL: &str = "logfunnel_sink_dispatches_total";

/// Sink: 전송 완료된 바이트 수 (counter)
pub const SINK_BYTES_DISPATCHED_TOTAL: &str = "logfunnel_sink_bytes_dispatched_total";

/// Sink: 버퍼에 쌓인 바이트 수 (gauge)
pub const SINK_BUFFERED_BYTES: &str = "logfunnel_sink_buffered_bytes";

/// 모든 메트릭의 설명을 등록합니다.
///
/// 레코더 설치 직후 한 번 호출합니다. 레코더가 없으면 아무 일도 하지 않습니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        SINK_RECORDS_APPENDED_TOTAL,
        "Records accepted by the batching sink"
    );
    describe_counter!(
        SINK_RECORDS_REJECTED_TOTAL,
        "Records rejected because they exceed the oversize threshold"
    );
    describe_counter!(SINK_FLUSHES_TOTAL, "Buffer flushes by trigger");
    describe_counter!(
        SINK_BYPASS_DISPATCHES_TOTAL,
        "Records larger than the buffer dispatched on their own"
    );
    describe_counter!(SINK_DISPATCHES_TOTAL, "Transport dispatch attempts by result");
    describe_counter!(
        SINK_BYTES_DISPATCHED_TOTAL,
        "Bytes successfully handed to the transport"
    );
    describe_gauge!(SINK_BUFFERED_BYTES, "Bytes currently held in the sink buffer");
}
