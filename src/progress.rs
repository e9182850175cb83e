//! Human-readable progress reporting.
//!
//! Protocols report checkpoints through a [`Progress`]. Every checkpoint is
//! logged with `tracing`; when the caller supplied a callback it also receives
//! the message. Without a callback the protocols behave identically.

use tracing::debug;

#[derive(Clone, Copy, Default)]
pub struct Progress<'a> {
    sink: Option<&'a dyn Fn(&str)>,
}

impl<'a> Progress<'a> {
    /// Reports through `tracing` only.
    pub fn silent() -> Self {
        Self { sink: None }
    }

    pub fn new(sink: &'a dyn Fn(&str)) -> Self {
        Self { sink: Some(sink) }
    }

    pub fn report(&self, message: &str) {
        debug!(target: "qnet_sim::progress", "{message}");
        if let Some(sink) = self.sink {
            sink(message);
        }
    }
}

impl std::fmt::Debug for Progress<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Progress")
            .field("callback", &self.sink.is_some())
            .finish()
    }
}
