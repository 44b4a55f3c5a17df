//! Document Queries

use crate::domain::document::DocumentId;

/// 列出用户的所有文档
///
/// user_id 为空时返回空列表（未登录）
#[derive(Debug, Clone)]
pub struct ListUserDocuments {
    pub user_id: String,
}

/// 获取文档详情查询
#[derive(Debug, Clone)]
pub struct GetDocument {
    pub document_id: DocumentId,
}

/// 获取文档原文件的浏览/下载地址
#[derive(Debug, Clone)]
pub struct GetFileUrls {
    pub document_id: DocumentId,
}
