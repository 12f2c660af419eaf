pub mod chat_stream;
pub mod config;
pub mod constants;
pub mod conversation;
pub mod conversation_list;
pub mod executor;
pub mod markdown_repair;
pub mod message;
pub mod message_store;
pub mod runtime;
pub mod sync;
pub mod title_poll;
pub mod title_reveal;
