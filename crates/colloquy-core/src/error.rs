use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;

use crate::app::domain::reduce::{InvalidActionKind, ReduceError};
use crate::app::domain::runtime::SessionError;
use crate::attachments::{UploadError, ValidationError};
use crate::config::ConfigError;
use crate::history::HistoryError;
use crate::session::SessionStoreError;
use crate::tools::TrackerError;

pub const DELETING_CHAT: &str = "Deleting chat...";
pub const CHAT_DELETED: &str = "Chat deleted successfully";
pub const CHAT_DELETE_FAILED: &str = "Failed to delete chat";
pub const HISTORY_LOAD_FAILED: &str = "Failed to load chat history";
pub const CHAT_LOAD_FAILED: &str = "Failed to load chat";
pub const UPLOAD_FAILED: &str = "Upload failed";

#[derive(Error, Debug)]
pub enum Error {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Upload(#[from] UploadError),

    #[error(transparent)]
    Tracker(#[from] TrackerError),

    #[error(transparent)]
    Reduce(#[from] ReduceError),

    #[error(transparent)]
    Session(#[from] SessionError),

    #[error(transparent)]
    History(#[from] HistoryError),

    #[error(transparent)]
    Store(#[from] SessionStoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum NoticeLevel {
    /// An operation is under way.
    Loading,
    Success,
    Error,
}

/// A transient, user-facing message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

impl Notice {
    pub fn loading(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Loading,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NoticeLevel::Error,
            message: message.into(),
        }
    }
}

impl Error {
    /// What to show the user for this error. Nothing here is fatal; the
    /// session stays usable after any of them.
    pub fn notice(&self) -> Notice {
        match self {
            Error::Validation(e) | Error::Upload(UploadError::Rejected(e)) => {
                Notice::error(e.to_string())
            }
            Error::Upload(UploadError::Failed { .. }) => Notice::error(UPLOAD_FAILED),
            Error::Tracker(e) => Notice::error(e.to_string()),
            Error::Reduce(ReduceError::InvalidAction { kind, message }) => match kind {
                InvalidActionKind::Busy => {
                    Notice::error("Please wait for the model to finish its response!")
                }
                InvalidActionKind::EmptyMessage | InvalidActionKind::WrongSession => {
                    Notice::error(message.clone())
                }
            },
            Error::Reduce(e @ ReduceError::Protocol { .. }) => Notice::error(e.to_string()),
            Error::Session(e) => e.notice(),
            Error::History(e) => e.notice(),
            Error::Store(_) => Notice::error(CHAT_LOAD_FAILED),
            Error::Config(e) => Notice::error(e.to_string()),
            Error::Io(e) => Notice::error(e.to_string()),
        }
    }
}
