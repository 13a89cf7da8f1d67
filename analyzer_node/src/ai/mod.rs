//! LLM-backed engines: contract analysis, chat, and translation.

pub mod analysis;
pub mod chat;
pub mod provider;
pub mod report;
pub mod translate;
