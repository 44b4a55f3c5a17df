//! Audio Context - 语音合成缓存与播放状态
//!
//! 职责:
//! - 缓存 key 计算（文本 → 稳定哈希）
//! - 文档级语音缓存清单（ttsSummaryParts 字段的类型化表示）
//! - 播放状态机（状态 + 触发事件 → 新状态）

mod cache_key;
mod manifest;
mod status;

pub use cache_key::CacheKey;
pub use manifest::{AudioManifest, ManifestEntry};
pub use status::{PlaybackStatus, PlayerTrigger};
