//! 播放状态机
//!
//! 播放控制器对外只暴露一个状态值。所有状态变化都经过 [`PlaybackStatus::next`]，
//! 以穷举 match 的形式列出完整的转移表。

use serde::{Deserialize, Serialize};

/// 播放状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Generating,
    Downloading,
    Playing,
    Paused,
    Error,
}

/// 触发状态转移的事件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerTrigger {
    /// 用户请求生成并播放
    Generate,
    /// 输入校验失败（空文本等）
    Invalid,
    /// 缓存命中，跳过合成
    CacheHit,
    /// 合成成功
    Synthesized,
    /// 合成失败
    SynthesisFailed,
    /// 音频下载完成且已开始播放
    Fetched,
    /// 音频下载失败
    FetchFailed,
    /// 播放引擎加载失败
    LoadFailed,
    Pause,
    Resume,
    Stop,
    /// 播放自然结束
    Ended,
    /// 播放引擎在播放中报错
    EngineFailed,
}

impl PlaybackStatus {
    /// 状态转移表
    ///
    /// 返回 `None` 表示该事件在当前状态下被拒绝（状态保持不变）。
    pub fn next(self, trigger: PlayerTrigger) -> Option<PlaybackStatus> {
        use PlaybackStatus::*;
        use PlayerTrigger::*;

        match (self, trigger) {
            (_, Generate) => Some(Generating),
            (_, Invalid) => Some(Error),
            (_, Stop) => Some(Idle),

            (Generating, CacheHit | Synthesized) => Some(Downloading),
            (Generating, SynthesisFailed) => Some(Error),

            (Downloading, Fetched) => Some(Playing),
            (Downloading, FetchFailed | LoadFailed) => Some(Error),

            (Playing, Pause) => Some(Paused),
            (Paused, Resume) => Some(Playing),
            (Playing, Ended) => Some(Idle),
            (Playing | Paused, EngineFailed) => Some(Error),

            (
                Idle | Generating | Downloading | Playing | Paused | Error,
                CacheHit | Synthesized | SynthesisFailed | Fetched | FetchFailed | LoadFailed
                | Pause | Resume | Ended | EngineFailed,
            ) => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Generating => "generating",
            Self::Downloading => "downloading",
            Self::Playing => "playing",
            Self::Paused => "paused",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for PlaybackStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::PlaybackStatus::*;
    use super::PlayerTrigger::*;
    use super::*;

    const ALL: [PlaybackStatus; 6] = [Idle, Generating, Downloading, Playing, Paused, Error];

    #[test]
    fn test_happy_path() {
        let s = Idle.next(Generate).unwrap();
        assert_eq!(s, Generating);
        let s = s.next(Synthesized).unwrap();
        assert_eq!(s, Downloading);
        let s = s.next(Fetched).unwrap();
        assert_eq!(s, Playing);
        assert_eq!(s.next(Ended), Some(Idle));
    }

    #[test]
    fn test_idle_cannot_jump_to_playing() {
        assert_eq!(Idle.next(Fetched), None);
        assert_eq!(Idle.next(CacheHit), None);
        assert_eq!(Generating.next(Fetched), None);
    }

    #[test]
    fn test_pause_resume_only_in_transport_states() {
        assert_eq!(Playing.next(Pause), Some(Paused));
        assert_eq!(Paused.next(Resume), Some(Playing));
        for s in ALL {
            if s != Playing {
                assert_eq!(s.next(Pause), None, "pause from {}", s);
            }
            if s != Paused {
                assert_eq!(s.next(Resume), None, "resume from {}", s);
            }
        }
    }

    #[test]
    fn test_stop_and_generate_from_any_state() {
        for s in ALL {
            assert_eq!(s.next(Stop), Some(Idle));
            assert_eq!(s.next(Generate), Some(Generating));
            assert_eq!(s.next(Invalid), Some(Error));
        }
    }

    #[test]
    fn test_failures_lead_to_error() {
        assert_eq!(Generating.next(SynthesisFailed), Some(Error));
        assert_eq!(Downloading.next(FetchFailed), Some(Error));
        assert_eq!(Downloading.next(LoadFailed), Some(Error));
        assert_eq!(Paused.next(EngineFailed), Some(Error));
        assert_eq!(Idle.next(EngineFailed), None);
    }

    #[test]
    fn test_ended_only_while_playing() {
        assert_eq!(Paused.next(Ended), None);
        assert_eq!(Idle.next(Ended), None);
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Downloading).unwrap(), "\"downloading\"");
    }
}
