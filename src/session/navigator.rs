use std::sync::Mutex;

/// Performs full (non in-app) navigations on behalf of the session core.
pub trait Navigator: Send + Sync {
    fn assign(&self, location: &str);
}

/// Navigator for headless hosts such as the CLI: records the request in the
/// log and nothing else.
#[derive(Debug, Default, Clone)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn assign(&self, location: &str) {
        tracing::info!(location, "navigation requested");
    }
}

/// Keeps every requested location; used by tests and embedders that apply
/// navigations themselves.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    visited: Mutex<Vec<String>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn visited(&self) -> Vec<String> {
        self.visited
            .lock()
            .map(|visited| visited.clone())
            .unwrap_or_default()
    }
}

impl Navigator for RecordingNavigator {
    fn assign(&self, location: &str) {
        if let Ok(mut visited) = self.visited.lock() {
            visited.push(location.to_string());
        }
    }
}
