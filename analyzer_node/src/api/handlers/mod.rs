pub mod analyze;
pub mod chat;
pub mod contracts;
pub mod market;
pub mod playground;
