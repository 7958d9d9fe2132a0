//! 크기 초과 레코드 가드
//!
//! [`OversizeGuard`]는 버퍼 용량과 무관한 고정 한도(전송 계층 최대 페이로드)를 기준으로
//! 레코드를 검사합니다. 한도를 넘는 레코드는 분할하지 않고 버립니다.
//! 분할하면 관련된 데이터가 서로 다른 파티션으로 흩어지기 때문입니다.

use crate::config::MAX_RECORD_BYTES;
use crate::error::SinkError;

/// 거부된 레코드를 식별하기 위해 로그에 남기는 앞부분 길이 (바이트)
const PREVIEW_BYTES: usize = 256;

/// 크기 초과 레코드 가드
#[derive(Debug, Clone, Copy)]
pub struct OversizeGuard {
    max_record_bytes: usize,
}

impl OversizeGuard {
    /// 지정한 한도로 가드를 생성합니다.
    pub fn new(max_record_bytes: usize) -> Self {
        Self { max_record_bytes }
    }

    /// 허용 최대 크기를 반환합니다.
    pub fn max_record_bytes(&self) -> usize {
        self.max_record_bytes
    }

    /// 레코드가 한도 이내인지 검사합니다.
    pub fn check(&self, record: &[u8]) -> Result<(), SinkError> {
        if record.len() > self.max_record_bytes {
            return Err(SinkError::OversizeRecord {
                size: record.len(),
                max: self.max_record_bytes,
            });
        }
        Ok(())
    }
}

impl Default for OversizeGuard {
    fn default() -> Self {
        Self::new(MAX_RECORD_BYTES)
    }
}

/// 거부된 레코드의 앞부분을 사람이 읽을 수 있는 형태로 만듭니다.
pub fn preview(record: &[u8]) -> String {
    let head = &record[..record.len().min(PREVIEW_BYTES)];
    let mut text = String::from_utf8_lossy(head).into_owned();
    if record.len() > PREVIEW_BYTES {
        text.push_str("...");
    }
    text
}
