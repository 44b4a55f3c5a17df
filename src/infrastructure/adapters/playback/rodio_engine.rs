//! Rodio Playback Engine - 本地音频设备输出
//!
//! `rodio::OutputStream` 在部分平台上不是 Send，只能留在创建它的线程中。
//! 这里由专用线程持有 OutputStream，引擎本身只保存可跨线程的 OutputStreamHandle 与 Sink。

use std::collections::HashMap;
use std::io::Cursor;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{mpsc, Arc, Mutex};
use std::thread;

use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use tokio::sync::broadcast;

use crate::application::ports::{
    AudioResource, EngineEvent, PlaybackEngineError, PlaybackEnginePort, PlaybackHandle,
};

const EVENT_CAPACITY: usize = 64;

struct Slot {
    sink: Arc<Sink>,
    /// 自然结束后保留，直到 stop 释放
    finished: bool,
}

type Slots = Arc<Mutex<HashMap<PlaybackHandle, Slot>>>;

/// Rodio Playback Engine
pub struct RodioPlaybackEngine {
    stream: OutputStreamHandle,
    slots: Slots,
    next_handle: AtomicU64,
    events: broadcast::Sender<EngineEvent>,
    /// drop 时关闭，音频线程随之退出并释放设备
    shutdown: Option<mpsc::Sender<()>>,
    thread: Option<thread::JoinHandle<()>>,
}

impl RodioPlaybackEngine {
    /// 在默认输出设备上启动音频线程
    pub fn spawn() -> Result<Self, PlaybackEngineError> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (init_tx, init_rx) = mpsc::channel::<Result<OutputStreamHandle, PlaybackEngineError>>();

        let thread = thread::Builder::new()
            .name("execudoc-audio".into())
            .spawn(move || {
                let (stream, handle) = match OutputStream::try_default() {
                    Ok(pair) => pair,
                    Err(e) => {
                        let _ = init_tx.send(Err(PlaybackEngineError::DeviceError(e.to_string())));
                        return;
                    }
                };
                if init_tx.send(Ok(handle)).is_err() {
                    return;
                }
                // 阻塞直到引擎被 drop
                let _ = shutdown_rx.recv();
                drop(stream);
                tracing::debug!("Audio thread stopped");
            })
            .map_err(|e| PlaybackEngineError::DeviceError(format!("failed to spawn audio thread: {}", e)))?;

        let stream = init_rx
            .recv()
            .map_err(|_| PlaybackEngineError::DeviceError("audio thread died".to_string()))??;

        tracing::info!("Audio playback initialized on default output device");

        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Ok(Self {
            stream,
            slots: Arc::new(Mutex::new(HashMap::new())),
            next_handle: AtomicU64::new(1),
            events,
            shutdown: Some(shutdown_tx),
            thread: Some(thread),
        })
    }

    fn sink(&self, handle: PlaybackHandle) -> Result<Arc<Sink>, PlaybackEngineError> {
        let slots = self.lock_slots()?;
        slots
            .get(&handle)
            .filter(|slot| !slot.finished)
            .map(|slot| slot.sink.clone())
            .ok_or(PlaybackEngineError::UnknownHandle(handle))
    }

    fn lock_slots(&self) -> Result<std::sync::MutexGuard<'_, HashMap<PlaybackHandle, Slot>>, PlaybackEngineError> {
        self.slots
            .lock()
            .map_err(|_| PlaybackEngineError::DeviceError("playback state poisoned".to_string()))
    }

    /// 后台线程等待播放队列耗尽，自然结束时广播 Finished
    fn spawn_completion_watcher(&self, handle: PlaybackHandle, sink: Arc<Sink>) {
        let slots = Arc::clone(&self.slots);
        let events = self.events.clone();

        thread::spawn(move || {
            sink.sleep_until_end();

            let Ok(mut slots) = slots.lock() else {
                return;
            };
            // stop 已移除句柄时不再通知
            let Some(slot) = slots.get_mut(&handle) else {
                return;
            };
            slot.finished = true;
            drop(slots);

            tracing::debug!(handle = %handle, "Playback finished naturally");
            let _ = events.send(EngineEvent::Finished(handle));
        });
    }
}

impl PlaybackEnginePort for RodioPlaybackEngine {
    fn load(&self, resource: &AudioResource) -> Result<PlaybackHandle, PlaybackEngineError> {
        let source = Decoder::new(Cursor::new(resource.data.clone()))
            .map_err(|e| PlaybackEngineError::LoadFailed(e.to_string()))?;
        let sink = Sink::try_new(&self.stream).map_err(|e| PlaybackEngineError::DeviceError(e.to_string()))?;
        sink.pause();
        sink.append(source);

        let handle = PlaybackHandle::new(self.next_handle.fetch_add(1, Ordering::SeqCst));
        self.lock_slots()?.insert(
            handle,
            Slot {
                sink: Arc::new(sink),
                finished: false,
            },
        );

        tracing::debug!(handle = %handle, file_id = %resource.asset.file_id, "Audio loaded");
        Ok(handle)
    }

    fn play(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        let sink = self.sink(handle)?;
        sink.play();
        self.spawn_completion_watcher(handle, sink);
        Ok(())
    }

    fn pause(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        self.sink(handle)?.pause();
        Ok(())
    }

    fn resume(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        self.sink(handle)?.play();
        Ok(())
    }

    fn stop(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError> {
        let slot = self
            .lock_slots()?
            .remove(&handle)
            .ok_or(PlaybackEngineError::UnknownHandle(handle))?;
        slot.sink.stop();
        Ok(())
    }

    fn active(&self) -> Vec<PlaybackHandle> {
        self.lock_slots()
            .map(|slots| {
                slots
                    .iter()
                    .filter(|(_, slot)| !slot.finished)
                    .map(|(handle, _)| *handle)
                    .collect()
            })
            .unwrap_or_default()
    }

    fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.events.subscribe()
    }
}

impl Drop for RodioPlaybackEngine {
    fn drop(&mut self) {
        if let Ok(mut slots) = self.slots.lock() {
            for (_, slot) in slots.drain() {
                slot.sink.stop();
            }
        }
        self.shutdown.take();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}
