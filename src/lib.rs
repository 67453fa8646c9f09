// src/lib.rs

pub mod cache;
pub mod config;
pub mod history;
pub mod llm;
pub mod memory;
pub mod qa;
pub mod sentence;
pub mod server;
