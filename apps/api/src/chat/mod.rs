//! The chat turn: validation, retrieval, classification, prompt assembly and
//! the streamed answer.

pub mod handlers;
pub mod history;
pub mod prompt;
pub mod relay;
pub mod sanitize;
