//! Playback Engine Port - 本地音频输出设备抽象
//!
//! 设备句柄由单个播放控制器独占；自然结束和播放错误通过广播通道异步通知

use thiserror::Error;
use tokio::sync::broadcast;

use super::AudioResource;

#[derive(Debug, Error)]
pub enum PlaybackEngineError {
    #[error("Failed to load audio: {0}")]
    LoadFailed(String),

    #[error("Unknown playback handle: {0}")]
    UnknownHandle(PlaybackHandle),

    #[error("Audio device error: {0}")]
    DeviceError(String),
}

/// 播放资源句柄
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlaybackHandle(u64);

impl PlaybackHandle {
    pub fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn raw(&self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PlaybackHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// 引擎异步通知
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// 播放自然结束
    Finished(PlaybackHandle),
    /// 播放过程中出错
    Failed {
        handle: PlaybackHandle,
        message: String,
    },
}

impl EngineEvent {
    pub fn handle(&self) -> PlaybackHandle {
        match self {
            EngineEvent::Finished(handle) => *handle,
            EngineEvent::Failed { handle, .. } => *handle,
        }
    }
}

/// Playback Engine Port
pub trait PlaybackEnginePort: Send + Sync {
    /// 加载音频数据，返回新句柄（尚未开始播放）
    fn load(&self, resource: &AudioResource) -> Result<PlaybackHandle, PlaybackEngineError>;

    fn play(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError>;

    fn pause(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError>;

    fn resume(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError>;

    /// 停止并释放句柄；释放出错时句柄同样失效
    fn stop(&self, handle: PlaybackHandle) -> Result<(), PlaybackEngineError>;

    /// 当前仍占用设备的句柄
    fn active(&self) -> Vec<PlaybackHandle>;

    /// 订阅完成/错误通知
    fn subscribe(&self) -> broadcast::Receiver<EngineEvent>;
}
