//! 应用层 - 查询（读操作）
//!
//! CQRS 查询侧：当前用户、文档列表、详情与文件地址

mod account_queries;
mod document_queries;

pub mod handlers;

pub use account_queries::*;
pub use document_queries::*;
