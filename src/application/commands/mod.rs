//! 应用层 - 命令（写操作）
//!
//! CQRS 命令侧：账号登录、上传、删除、远端处理任务

mod account_commands;
mod document_commands;

pub mod handlers;

pub use account_commands::*;
pub use document_commands::*;
