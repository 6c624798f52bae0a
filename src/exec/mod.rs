// src/exec/mod.rs

//! Procedure execution layer.
//!
//! - [`process`] provides the `ProcessRunner` trait and the production
//!   `TokioProcessRunner`, which owns the table of running processes so
//!   `stdin` procedures can find their target.
//! - [`plugin`] provides the `PluginDispatch` trait consulted for
//!   `plugin:<name>` modes.
//! - [`procedure`] contains the `ProcedureExecutor` that walks a command's
//!   procedure list, honouring `wait` and `ignore_failure`.

use std::future::Future;
use std::pin::Pin;

pub mod plugin;
pub mod procedure;
pub mod process;

pub use plugin::{NoPlugins, PluginDispatch};
pub use procedure::{EnqueueFn, ProcedureExecutor};
pub use process::{ProcessRequest, ProcessRunner, TokioProcessRunner};

/// Boxed future returned by the object-safe collaborator traits.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
