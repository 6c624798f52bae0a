use parking_lot::Mutex;

use scrolld::errors::{Result, ScrollError};
use scrolld::exec::{BoxFuture, PluginDispatch};

/// A fake plugin dispatcher that claims a single plugin name and records
/// every payload it receives.
pub struct FakePlugin {
    name: String,
    fail: bool,
    calls: Mutex<Vec<String>>,
}

impl FakePlugin {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            fail: false,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Make every dispatch fail with an error.
    pub fn failing(mut self) -> Self {
        self.fail = true;
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }
}

impl PluginDispatch for FakePlugin {
    fn handles(&self, mode: &str) -> bool {
        mode == self.name
    }

    fn dispatch<'a>(&'a self, mode: &'a str, payload: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move {
            self.calls.lock().push(payload.to_string());
            if self.fail {
                return Err(ScrollError::Other(anyhow::anyhow!(
                    "plugin '{mode}' rejected payload"
                )));
            }
            Ok(format!("{mode}:{payload}"))
        })
    }
}
