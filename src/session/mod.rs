// src/session/mod.rs
//! Session/Token Holder: the current bearer credential and admin identity.

pub mod holder;
pub mod token_store;

pub use holder::{Session, SessionState};
pub use token_store::{FileTokenStore, MemoryTokenStore, TokenStore, TOKEN_KEY};
