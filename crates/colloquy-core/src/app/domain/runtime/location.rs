/// Receives the one-shot canonical URL of a session and rewrites the
/// client-visible location. Called at most once per session.
pub trait LocationSink: Send + Sync {
    fn replace_location(&self, url: &str);
}

#[cfg(any(test, feature = "test-utils"))]
pub use recording::RecordingLocation;

#[cfg(any(test, feature = "test-utils"))]
mod recording {
    use std::sync::Mutex;

    use super::LocationSink;

    /// Remembers every URL it was given.
    #[derive(Default)]
    pub struct RecordingLocation {
        urls: Mutex<Vec<String>>,
    }

    impl RecordingLocation {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn urls(&self) -> Vec<String> {
            self.urls
                .lock()
                .map(|urls| urls.clone())
                .unwrap_or_default()
        }
    }

    impl LocationSink for RecordingLocation {
        fn replace_location(&self, url: &str) {
            if let Ok(mut urls) = self.urls.lock() {
                urls.push(url.to_string());
            }
        }
    }
}
