//! Session state: the per-context store and the persisted login hint.

pub mod hint;
pub mod store;

pub use hint::{FileLoginHint, LOGIN_HINT_KEY, LoginHint, MemoryLoginHint};
pub use store::{SessionRecord, SessionStore};
