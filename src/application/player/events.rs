//! 播放控制器的配置、快照与通知类型

use serde::Serialize;

use crate::application::ports::PlaybackHandle;
use crate::domain::audio::PlaybackStatus;

/// 播放控制器配置
#[derive(Debug, Clone)]
pub struct PlayerConfig {
    /// 是否读写远端文档中的语音缓存清单
    pub use_db: bool,
    /// 每个文档缓存清单的最大条目数
    pub max_manifest_entries: usize,
    /// 状态通知通道容量
    pub event_capacity: usize,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            use_db: true,
            max_manifest_entries: 16,
            event_capacity: 64,
        }
    }
}

/// 当前状态快照（供界面同步读取）
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlayerSnapshot {
    pub status: PlaybackStatus,
    pub error: Option<String>,
    pub text: Option<String>,
    pub request_id: u64,
}

/// 状态变化通知
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum PlayerEvent {
    StatusChanged {
        request_id: u64,
        from: PlaybackStatus,
        to: PlaybackStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
}

/// generate_and_play 的结果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayOutcome {
    /// 已开始播放
    Playing(PlaybackHandle),
    /// 被更新的请求取代或控制器已卸载，结果被丢弃
    Superseded,
    /// 失败，状态已进入 error
    Failed(String),
}
