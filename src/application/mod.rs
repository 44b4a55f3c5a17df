//! 应用层 - 用例编排
//!
//! 包含：
//! - ports: 六边形架构端口定义（账号与会话、远端任务、语音合成、音频资源、播放引擎、文档存储）
//! - commands: CQRS 命令及处理器
//! - queries: CQRS 查询及处理器
//! - player: 语音生成与播放控制器
//! - error: 应用层错误定义

pub mod commands;
pub mod error;
pub mod player;
pub mod ports;
pub mod queries;

// Re-exports
pub use commands::{
    DeleteDocument, ExtractDocumentText, IssueJwt, Login, Logout, Register, ResolveListenText,
    SummarizeDocument, TextSource, UploadDocument,
    // Handlers
    handlers::{
        DeleteDocumentHandler, DeleteDocumentResponse, ExtractTextHandler, IssueJwtHandler,
        ListenText, LoginHandler, LogoutHandler, RegisterHandler, ResolveListenTextHandler,
        SummarizeHandler, UploadDocumentHandler,
    },
};

pub use error::ApplicationError;

pub use player::{AudioCache, AudioController, PlayOutcome, PlayerConfig, PlayerEvent, PlayerSnapshot};

pub use ports::{
    // Account
    AccountError,
    AccountPort,
    AccountSession,
    SessionStoreError,
    SessionStorePort,
    UserProfile,
    // Audio assets
    AssetError,
    AudioAssetPort,
    AudioResource,
    // Document store
    DocumentField,
    DocumentRepositoryPort,
    FileStorageError,
    FileStoragePort,
    RepositoryError,
    UploadFile,
    // Playback engine
    EngineEvent,
    PlaybackEngineError,
    PlaybackEnginePort,
    PlaybackHandle,
    // Remote jobs
    ExtractOutcome,
    JobError,
    JobTarget,
    RemoteJobPort,
    SummaryOutcome,
    // Speech synthesis
    AudioAsset,
    SpeechSynthesisPort,
    SynthesisError,
};

pub use queries::{
    GetCurrentUser, GetDocument, GetFileUrls, ListUserDocuments,
    // Handlers
    handlers::{
        DocumentResponse, FileUrlsResponse, GetCurrentUserHandler, GetDocumentHandler,
        GetFileUrlsHandler, ListUserDocumentsHandler,
    },
};
