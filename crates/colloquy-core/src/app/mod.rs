pub mod domain;

pub use domain::message::{Message, MessageContent, Role};
