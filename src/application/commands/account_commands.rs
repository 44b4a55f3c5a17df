//! Account Commands

/// 注册命令（注册成功后立即登录）
#[derive(Debug, Clone)]
pub struct Register {
    pub email: String,
    pub password: String,
    pub name: String,
}

/// 邮箱密码登录命令
#[derive(Debug, Clone)]
pub struct Login {
    pub email: String,
    pub password: String,
}

/// 注销命令（注销远端全部会话并清除本地会话）
#[derive(Debug, Clone, Default)]
pub struct Logout;

/// 为当前会话签发 JWT
#[derive(Debug, Clone, Default)]
pub struct IssueJwt;
