//! 지연 플러시 타이머
//!
//! [`FlushTimer`]는 재무장 가능한 일회성 타이머입니다. 고정 주기 타이머가 아니라
//! 플러시가 일어날 때마다 이전 태스크를 버리고 전체 지연을 새로 시작합니다.
//!
//! 무장할 때마다 세대(generation) 번호가 증가합니다. 만료 콜백은 자기 세대 번호를
//! 받으므로, 소유자는 락을 잡은 뒤 [`FlushTimer::is_current`]로 오래된 만료를 걸러냅니다.
//! 이미 만료되어 락을 기다리던 콜백이 재무장 직후 실행되는 경쟁을 이렇게 막습니다.

use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

pub(crate) struct FlushTimer {
    delay: Duration,
    generation: u64,
    task: Option<JoinHandle<()>>,
    cancel: CancellationToken,
}

impl FlushTimer {
    pub(crate) fn new(delay: Duration) -> Self {
        Self {
            delay,
            generation: 0,
            task: None,
            cancel: CancellationToken::new(),
        }
    }

    pub(crate) fn delay(&self) -> Duration {
        self.delay
    }

    /// 대기 중인 태스크를 버리고 전체 지연으로 다시 무장합니다.
    ///
    /// 취소된 타이머는 다시 무장되지 않습니다.
    pub(crate) fn rearm<F>(&mut self, runtime: &Handle, fire: F)
    where
        F: FnOnce(u64) + Send + 'static,
    {
        if self.cancel.is_cancelled() {
            return;
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }

        self.generation = self.generation.wrapping_add(1);
        let generation = self.generation;
        let token = self.cancel.clone();
        let delay = self.delay;

        self.task = Some(runtime.spawn(async move {
            tokio::select! {
                () = token.cancelled() => {}
                () = tokio::time::sleep(delay) => fire(generation),
            }
        }));
    }

    /// 만료 콜백의 세대가 현재 무장 상태와 일치하는지 확인합니다.
    pub(crate) fn is_current(&self, generation: u64) -> bool {
        !self.cancel.is_cancelled() && generation == self.generation
    }

    /// 타이머를 영구히 취소합니다.
    pub(crate) fn cancel(&mut self) {
        self.cancel.cancel();
        if let Some(task) = self.task.take() {
            task.abort();
        }
    }
}

impl Drop for FlushTimer {
    fn drop(&mut self) {
        self.cancel();
    }
}
