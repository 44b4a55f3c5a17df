//! Appwrite 适配器 - 账号、数据库、存储与远端函数
//!
//! 所有请求共用一个 AppwriteClient（项目 ID、登录会话或 JWT、超时）

mod account;
mod client;
mod databases;
mod functions;
mod storage;

pub use account::AppwriteAccount;
pub use client::{failure_message, AppwriteClient, Failure};
pub use databases::AppwriteDocumentRepository;
pub use functions::HttpJobClient;
pub use storage::{AppwriteAudioAssets, AppwriteFileStorage};
