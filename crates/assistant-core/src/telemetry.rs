use tracing::{Span, info_span};

/// Logging context handed to every component when it is constructed.
///
/// Components never log against an ambient span: each event is emitted with
/// `parent: log.span()` so the span tree mirrors the component tree built in
/// [`crate::assistant::Assistant::new`].
#[derive(Debug, Clone)]
pub struct LogContext {
    span: Span,
}

impl LogContext {
    pub fn session(session_label: &str) -> Self {
        Self {
            span: info_span!("jarvis", session = session_label),
        }
    }

    /// Context that records nothing. Handy for tests and one-off tools.
    pub fn disabled() -> Self {
        Self {
            span: Span::none(),
        }
    }

    pub fn component(&self, name: &'static str) -> Self {
        Self {
            span: info_span!(parent: &self.span, "component", name),
        }
    }

    pub fn span(&self) -> &Span {
        &self.span
    }
}

impl Default for LogContext {
    fn default() -> Self {
        Self::disabled()
    }
}
