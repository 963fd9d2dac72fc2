//! [`Observability`]: the handle each SDK component holds.

use crate::diagnostics::{DiagnosticCallback, Diagnostics};
use crate::metrics::MetricsRecorder;

/// Diagnostics plus metrics for one SDK instance. Cloning shares state.
#[derive(Clone, Debug, Default)]
pub struct Observability {
    pub diagnostics: Diagnostics,
    pub metrics: MetricsRecorder,
}

impl Observability {
    pub fn new(debug: bool, callback: Option<DiagnosticCallback>) -> Self {
        Self {
            diagnostics: Diagnostics::new(debug, callback),
            metrics: MetricsRecorder::default(),
        }
    }
}
