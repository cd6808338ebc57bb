//! Kurobot: a stateless Gemini chat gateway and its terminal client

pub mod api;
pub mod client;
pub mod config;
pub mod conversation;
pub mod gateway;
pub mod llm;
pub mod tui;
