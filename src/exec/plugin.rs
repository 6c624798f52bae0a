// src/exec/plugin.rs

//! Plugin subsystem seam.

use crate::errors::{Result, ScrollError};
use crate::exec::BoxFuture;

/// Dispatches `plugin:<name>` procedures.
///
/// `mode` is the `<name>` part of the procedure mode.
pub trait PluginDispatch: Send + Sync {
    /// Whether this dispatcher claims the given plugin mode.
    fn handles(&self, mode: &str) -> bool;

    /// Run the plugin call and return its textual result.
    fn dispatch<'a>(&'a self, mode: &'a str, payload: &'a str) -> BoxFuture<'a, Result<String>>;
}

/// Dispatcher used when no plugins are loaded; claims nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPlugins;

impl PluginDispatch for NoPlugins {
    fn handles(&self, _mode: &str) -> bool {
        false
    }

    fn dispatch<'a>(&'a self, mode: &'a str, _payload: &'a str) -> BoxFuture<'a, Result<String>> {
        Box::pin(async move { Err(ScrollError::UnsupportedMode(format!("plugin:{mode}"))) })
    }
}
