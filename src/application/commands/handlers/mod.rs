//! Command Handlers 实现

mod account_handlers;
mod document_handlers;
mod pipeline_handlers;

pub use account_handlers::*;
pub use document_handlers::*;
pub use pipeline_handlers::*;
