//! Session Adapter - 登录会话的本地持久化

mod file_store;

pub use file_store::FileSessionStore;
