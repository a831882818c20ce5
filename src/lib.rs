//! Conversational AI gateway
//!
//! Turns one chat turn (history, message, optional file) into a single reply
//! from a generative-AI provider: uploads are classified and converted to
//! text or inline data, a prompt is assembled around a fixed persona, and the
//! request walks an ordered list of (model, credential) candidates, falling
//! back only when a candidate is out of quota. First turns also get a short
//! conversation title.

pub mod ai;
pub mod app;
pub mod assembler;
pub mod config;
pub mod error;
pub mod gateway;
pub mod ingest;
pub mod models;
pub mod prompts;
pub mod quick_reply;
pub mod title;

pub use error::{Error, Result};
