//! Simulated Playback Engine - 不占用音频设备的播放引擎
//!
//! 按固定时长模拟播放（暂停期间不计时），也可由调用方手动结束或注入错误

use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::broadcast;

use crate::application::ports::{
    AudioResource, EngineEvent, PlaybackEngineError, PlaybackEnginePort, PlaybackHandle,
};

/// 通知通道容量
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SlotState {
    Loaded,
    Playing,
    Paused,
    /// 已结束或出错，等待 stop 释放
    Done,
}

#[derive(Debug)]
struct Slot {
    state: SlotState,
    /// 剩余播放时长（None 表示不会自动结束）
    remaining: Option<Duration>,
    started_at: Option<Instant>,
    /// 每次 play/resume/pause 递增，使旧的计时任务失效
    generation: u64,
}

struct Inner {
    slots: DashMap<PlaybackHandle, Slot>,
    next_handle: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
    duration: Option<Duration>,
    fail_loads: AtomicBool,
    fail_stops: AtomicBool,
}

impl Inner {
    fn complete(&self, handle: PlaybackHandle, event: EngineEvent) -> bool {
        let Some(mut slot) = self.slots.get_mut(&handle) else {
            return false;
        };
        if slot.state == SlotState::Done {
            return false;
        }
        slot.state = SlotState::Done;
        slot.generation += 1;
        drop(slot);

        // 没有订阅者时发送失败是正常的
        let _ = self.events.send(event);
        true
    }
}

/// Simulated Playback Engine
#[derive(Clone)]
pub struct SimulatedPlaybackEngine {
    inner: Arc<Inner>,
}

impl SimulatedPlaybackEngine {
    /// `duration` 为 None 时播放不会自动结束
    pub fn new(duration: Option<Duration>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            inner: Arc::new(Inner {
                slots: DashMap::new(),
                next_handle: AtomicU64::new(1),
                events,
                duration,
                fail_loads: AtomicBool::new(false),
                fail_stops: AtomicBool::new(false),
            }),
        }
    }

    /// 之后的 load 全部失败
    pub fn fail_loads(&self, fail: bool) {
        self.inner.fail_loads.store(fail, Ordering::SeqCst);
    }

    /// 之后的 stop 返回错误（句柄仍会被释放）
    pub fn fail_stops(&self, fail: bool) {
        self.inner.fail_stops.store(fail, Ordering::SeqCst);
    }

    /// 手动结束播放
    pub fn finish(&self, handle: PlaybackHandle) -> bool {
        self.inner.complete(handle, EngineEvent::Finished(handle))
    }

    /// 注入播放错误
    pub fn fail(&self, handle: PlaybackHandle, message: impl Into<String>) -> bool {
        self.inner.complete(
            handle,
            EngineEvent::Failed {
                handle,
                message: message.into(),
            },
        )
    }

    /// 句柄当前是否处于暂停
    pub fn is_paused(&self, handle: PlaybackHandle) -> bool {
        self.inner
            .slots
            .get(&handle)
            .map(|slot| slot.state == SlotState::Paused)
            .unwrap_or(false)
    }

    /// 开始计时，到期后自动结束
    fn arm_timer(&self, handle: PlaybackHandle, slot: &mut Slot) {
        slot.generation += 1;
        slot.started_at = Some(Instant::now());
        let Some(remaining) = slot.remaining else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            tracing::warn!(handle = %handle, "No async runtime, simulated playback will not end by itself");
            return;
        };

        let generation = slot.generation;
        let inner = Arc::downgrade(&self.inner);
        runtime.spawn(async move {
            tokio::time::sleep(remaining).await;
            let Some(inner) = inner.upgrade() else {
                return;
            };
            let current = inner
                .slots
                .get(&handle)
                .map(|slot| slot.state == SlotState::Playing && slot.generation == generation)
                .unwrap_or(false);
            if current {
                tracing::debug!(handle = %handle, "Simulated playback finished");
                inner.complete(handle, EngineEvent::Finished(handle));
            }
        });
    }

    fn with_slot<T>(
        &self,
        handle: PlaybackHandle,
        f: impl FnOnce(&mut Slot) -> Result<T, PlaybackEngineError>,
    ) -> Result<T, PlaybackEngineError> {
        let mut slot = self
            .inner
            .slots
            .get_mut(&handle)
            .ok_or(PlaybackEngineError::UnknownHandle(handle))?;
        f(&mut slot)
    }
}

impl PlaybackEnginePort for SimulatedPlaybackEngine {
    fn load(&self, resource: &AudioResource) -> Result<PlaybackHandle, PlaybackEngineError> {
        if self.inner.fail_loads.load(Ordering::SeqCst) {
            return Err(PlaybackEngineError::LoadFailed("simulated decoder failure".to_string()));
        }
        if resource.data.is_empty() {
            return Err(PlaybackEngineError::LoadFailed("empty audio data".to_string()));
        }

        let handle = PlaybackHandle::new(self.inner.next_handle.fetch_add(1, Ordering::SeqCst));
        self.inner.slots.insert(
            handle,
            Slot {
                state: SlotState::Loaded,
                remaining: self.inner.duration,
                started_at: None,
                generation: 0,
            },
        );
        tracing::debug!(handle = %handle, file_id = %resource.asset.file_id, size = resource.data.len(), "Audio loaded");
        Ok(handle)
    }

    fn play(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        self.with_slot(handle, |slot| match slot.state {
            SlotState::Loaded => {
                slot.state = SlotState::Playing;
                self.arm_timer(handle, slot);
                Ok(())
            }
            SlotState::Playing => Ok(()),
            state => Err(PlaybackEngineError::DeviceError(format!(
                "cannot play handle {} in state {:?}",
                handle, state
            ))),
        })
    }

    fn pause(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        self.with_slot(handle, |slot| match slot.state {
            SlotState::Playing => {
                if let (Some(remaining), Some(started_at)) = (slot.remaining, slot.started_at.take()) {
                    slot.remaining = Some(remaining.saturating_sub(started_at.elapsed()));
                }
                slot.generation += 1;
                slot.state = SlotState::Paused;
                Ok(())
            }
            SlotState::Paused => Ok(()),
            state => Err(PlaybackEngineError::DeviceError(format!(
                "cannot pause handle {} in state {:?}",
                handle, state
            ))),
        })
    }

    fn resume(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        self.with_slot(handle, |slot| match slot.state {
            SlotState::Paused => {
                slot.state = SlotState::Playing;
                self.arm_timer(handle, slot);
                Ok(())
            }
            SlotState::Playing => Ok(()),
            state => Err(PlaybackEngineError::DeviceError(format!(
                "cannot resume handle {} in state {:?}",
                handle, state
            ))),
        })
    }

    fn stop(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        let removed = self.inner.slots.remove(&handle);
        if self.inner.fail_stops.load(Ordering::SeqCst) {
            return Err(PlaybackEngineError::DeviceError("simulated stop failure".to_string()));
        }
        match removed {
            Some(_) => Ok(()),
            None => Err(PlaybackEngineError::UnknownHandle(handle)),
        }
    }

    fn active(&self) -> Vec<PlaybackHandle> {
        let mut handles: Vec<_> = self
            .inner
            .slots
            .iter()
            .filter(|entry| entry.state != SlotState::Done)
            .map(|entry| *entry.key())
            .collect();
        handles.sort_by_key(|h| h.raw());
        handles
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }
}
