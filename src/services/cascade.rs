use crate::error::Result;

/// A cleanup step that failed while the parent deletion went ahead.
#[derive(Debug, Clone)]
pub struct CascadeFailure {
    pub step: &'static str,
    pub error: String,
}

/// Collects the outcome of best-effort cleanup steps.
///
/// Steps never abort the cascade; their errors are logged and kept here so
/// callers and tests can see what was left behind.
#[derive(Debug, Clone)]
pub struct CascadeReport {
    subject: String,
    pub failures: Vec<CascadeFailure>,
}

impl CascadeReport {
    pub fn new(subject: impl Into<String>) -> Self {
        Self {
            subject: subject.into(),
            failures: Vec::new(),
        }
    }

    pub fn record<T>(&mut self, step: &'static str, result: Result<T>) -> Option<T> {
        match result {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(
                    subject = %self.subject,
                    step,
                    error = %e,
                    "cascade step failed, continuing"
                );
                self.failures.push(CascadeFailure {
                    step,
                    error: e.to_string(),
                });
                None
            }
        }
    }

    pub fn absorb(&mut self, other: CascadeReport) {
        self.failures.extend(other.failures);
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}
