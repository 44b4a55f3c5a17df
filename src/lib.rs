//! Execudoc - 文档朗读客户端核心
//!
//! 架构设计: DDD + CQRS + Hexagonal Architecture
//!
//! 领域层 (domain/):
//! - Document Context: 文档、文件类型、标识值对象
//! - Audio Context: 缓存 key、语音缓存清单、播放状态机
//!
//! 应用层 (application/):
//! - Ports: 端口定义（RemoteJob、SpeechSynthesis、AudioAsset、PlaybackEngine、DocumentStore）
//! - Commands: 上传、删除、提取、摘要、准备朗读文本
//! - Queries: 文档列表、详情、文件地址
//! - Player: 语音生成与播放控制器
//!
//! 基础设施层 (infrastructure/):
//! - Adapters: Appwrite REST（数据库、存储、函数）、TTS 客户端、播放引擎
//! - Memory: 内存实现（测试与离线运行）

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use config::{load_config, AppConfig};
