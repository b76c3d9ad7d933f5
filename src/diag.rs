use log::warn;

/// Collects the non-fatal findings of a scraping call.
///
/// Degraded-but-valid outcomes (an unmapped header token, a share with
/// no recorded timezone, an empty history response) are recorded here
/// and mirrored to the `log` facade, so callers can inspect them
/// without relying on global log configuration.
#[derive(Debug, Default)]
pub struct Diagnostics {
    warnings: Vec<String>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a warning and forwards it to `log::warn!`.
    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        warn!("{}", message);
        self.warnings.push(message);
    }

    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn is_empty(&self) -> bool {
        self.warnings.is_empty()
    }
}
