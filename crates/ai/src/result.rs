use thiserror::Error;

/// Failure of an analysis flow.
///
/// Workers treat these as transient handler failures: the retry/backoff
/// loop absorbs them, and only an exhausted retry budget surfaces the final
/// message to the user as the job's failure reason.
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The flow input was unusable (empty resume, no skills, ...).
    #[error("invalid analysis input: {0}")]
    InvalidInput(String),

    /// The underlying model/inference call failed.
    #[error("inference failed: {0}")]
    InferenceFailed(String),

    /// Anything else (serialization, internal bookkeeping).
    #[error("internal analysis error: {0}")]
    Internal(String),
}
