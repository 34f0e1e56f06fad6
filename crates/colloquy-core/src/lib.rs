// Core colloquy functionality without UI dependencies

pub mod app;
pub mod attachments;
pub mod config;
pub mod error;
pub mod history;
pub mod session;
pub mod tools;
pub mod utils;

pub use error::{Error, Notice, NoticeLevel, Result};
