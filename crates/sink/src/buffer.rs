//! 레코드 버퍼 -- 고정 용량 바이트 버퍼 및 오버플로우 정책
//!
//! [`RecordBuffer`]는 인코딩된 레코드를 이어 붙여 담는 고정 용량 버퍼입니다.
//! 용량 초과는 예외가 아니라 [`RecordBuffer::remaining`] 검사로 분기합니다.
//!
//! # 오버플로우 정책
//! [`RecordBuffer::place`]가 레코드를 받았을 때:
//! - 남은 공간에 들어가면 그대로 이어 붙임 ([`Placement::Buffered`])
//! - 들어가지 않으면 기존 내용을 통째로 잘라내고 (플러시),
//!   - 레코드가 전체 용량 이하이면 빈 버퍼에 담음
//!   - 전체 용량보다 크면 버퍼를 거치지 않고 단독 전송 대상으로 반환
//!
//! 플러시 경계는 항상 레코드 경계와 일치합니다. 버퍼는 부분 레코드를 담지 않습니다.

use bytes::{Bytes, BytesMut};

/// 레코드 배치 결과
#[derive(Debug, PartialEq, Eq)]
pub enum Placement {
    /// 남은 공간에 담김, 플러시 없음
    Buffered,
    /// 공간 부족으로 플러시가 일어남
    Overflow {
        /// 잘라낸 기존 내용 (버퍼가 비어 있었으면 `None`)
        flushed: Option<Bytes>,
        /// 버퍼 용량보다 커서 단독 전송해야 하는 레코드
        bypass: Option<Bytes>,
    },
}

/// 고정 용량 레코드 버퍼
pub struct RecordBuffer {
    /// 누적된 레코드 바이트
    data: BytesMut,
    /// 최대 용량 (바이트)
    capacity: usize,
}

impl RecordBuffer {
    /// 지정한 용량(바이트)으로 빈 버퍼를 생성합니다.
    pub fn new(capacity: usize) -> Self {
        Self {
            data: BytesMut::with_capacity(capacity),
            capacity,
        }
    }

    /// 현재 쓰기 위치(담긴 바이트 수)를 반환합니다.
    pub fn position(&self) -> usize {
        self.data.len()
    }

    /// 남은 공간(바이트)을 반환합니다.
    pub fn remaining(&self) -> usize {
        self.capacity - self.data.len()
    }

    /// 버퍼가 비어있는지 확인합니다.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// 레코드를 오버플로우 정책에 따라 배치합니다.
    pub fn place(&mut self, record: &[u8]) -> Placement {
        if record.len() <= self.remaining() {
            self.data.extend_from_slice(record);
            return Placement::Buffered;
        }

        let flushed = self.take();
        let bypass = if record.len() <= self.capacity {
            self.data.extend_from_slice(record);
            None
        } else {
            Some(Bytes::copy_from_slice(record))
        };

        Placement::Overflow { flushed, bypass }
    }

    /// 버퍼 내용을 모두 잘라내고 위치를 0으로 되돌립니다.
    ///
    /// 버퍼가 비어 있으면 `None`을 반환합니다.
    pub fn take(&mut self) -> Option<Bytes> {
        if self.data.is_empty() {
            return None;
        }
        Some(self.data.split().freeze())
    }
}
