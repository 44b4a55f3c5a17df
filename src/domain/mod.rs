//! Domain Layer - 领域层
//!
//! 包含两个限界上下文:
//! - Document Context: 文档管理
//! - Audio Context: 语音缓存清单与播放状态机

pub mod audio;
pub mod document;
