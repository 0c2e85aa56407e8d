pub mod chat_dtos;
// alias so callers can write `crate::dtos::chat`
pub use chat_dtos as chat;
