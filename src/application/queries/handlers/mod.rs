//! Query Handlers 实现

mod account_handlers;
mod document_handlers;

pub use account_handlers::*;
pub use document_handlers::*;
