//! Conversation session store.
//!
//! - `log`: `SessionLog` trait and the line-delimited codec
//! - `cache`: process-wide `SessionCache`
//! - `loader`: `SessionLoader` (cache, disk load, system-prompt repair)
//! - `assembler`: `TurnAssembler` builds the outbound backend request
//! - `controller`: `TurnController` runs one question/answer turn

pub mod assembler;
pub mod cache;
pub mod controller;
pub mod loader;
pub mod log;

#[cfg(test)]
pub(crate) mod testing;
