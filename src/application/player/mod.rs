//! Player - 语音生成与播放控制
//!
//! 包含：
//! - controller: 播放状态机编排
//! - cache: 文档级语音缓存读写
//! - events: 配置、状态快照与通知

mod cache;
mod controller;
mod events;

pub use cache::AudioCache;
pub use controller::AudioController;
pub use events::{PlayOutcome, PlayerConfig, PlayerEvent, PlayerSnapshot};
