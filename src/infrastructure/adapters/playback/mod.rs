//! Playback Adapter - 播放引擎实现
//!
//! - simulated: 不需要音频设备，按固定时长模拟播放
//! - rodio_engine: 本地音频设备输出（rodio-playback feature）

#[cfg(feature = "rodio-playback")]
mod rodio_engine;
mod simulated;

#[cfg(feature = "rodio-playback")]
pub use rodio_engine::RodioPlaybackEngine;
pub use simulated::SimulatedPlaybackEngine;
