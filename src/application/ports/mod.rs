//! Application Ports - 出站端口定义
//!
//! 定义应用层与基础设施层的抽象接口

mod account;
mod audio_assets;
mod document_store;
mod playback_engine;
mod remote_jobs;
mod speech_synthesis;

pub use account::{
    AccountError, AccountPort, AccountSession, SessionStoreError, SessionStorePort, UserProfile,
};
pub use audio_assets::{AssetError, AudioAssetPort, AudioResource};
pub use document_store::{
    DocumentField, DocumentRepositoryPort, FileStorageError, FileStoragePort, RepositoryError,
    UploadFile,
};
pub use playback_engine::{EngineEvent, PlaybackEngineError, PlaybackEnginePort, PlaybackHandle};
pub use remote_jobs::{ExtractOutcome, JobError, JobTarget, RemoteJobPort, SummaryOutcome};
pub use speech_synthesis::{AudioAsset, SpeechSynthesisPort, SynthesisError};
