//! Infrastructure Adapters
//!
//! 六边形架构的适配器实现

pub mod appwrite;
pub mod playback;
pub mod session;
pub mod tts;

pub use appwrite::*;
pub use playback::*;
pub use session::*;
pub use tts::*;
