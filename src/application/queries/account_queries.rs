//! Account Queries

/// 查询当前登录用户（未登录或会话失效时为空）
#[derive(Debug, Clone, Default)]
pub struct GetCurrentUser;
