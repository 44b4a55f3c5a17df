//! Memory Layer - 内存实现
//!
//! 账号、会话、文档记录、原文件与合成音频的内存存储，用于测试

mod accounts;
mod audio_assets;
mod document_repository;
mod file_storage;
mod session_store;

pub use accounts::InMemoryAccounts;
pub use audio_assets::InMemoryAudioAssets;
pub use document_repository::InMemoryDocumentRepository;
pub use file_storage::InMemoryFileStorage;
pub use session_store::InMemorySessionStore;
