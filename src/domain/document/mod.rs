//! Document Context - 文档限界上下文
//!
//! 职责:
//! - 文档聚合管理（上传后的文件、提取文本、摘要）
//! - 文件类型识别
//! - 语音缓存清单字段的归属

mod aggregate;
mod errors;
mod value_objects;

pub use aggregate::Document;
pub use errors::DocumentError;
pub use value_objects::{DocumentId, FileId, FileType, Title, UserId};
