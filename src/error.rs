use thiserror::Error;

/// Failure categories surfaced by extraction strategies.
///
/// Every stage of the pipeline catches its own failures and reports one of
/// these instead of throwing across realm or strategy boundaries. The only
/// caller-visible failure mode of the pipeline as a whole is "no transcript
/// obtained".
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ErrorKind {
    #[error("no video identifier resolvable from context")]
    NoIdentifier,

    #[error("page configuration unavailable")]
    NoConfig,

    #[error("no continuation token found in bootstrap response")]
    NoContinuationToken,

    #[error("upstream returned no usable segments")]
    EmptyUpstreamResponse,

    #[error("network error: {0}")]
    NetworkError(String),

    #[error("body matched a known format but failed to parse")]
    ParseFailure,

    #[error("timed out waiting for a response")]
    Timeout,
}

/// Upstream transport failures, internal to the page realm.
///
/// These never escape a strategy; the identity rotator logs and swallows
/// them, and strategy code maps them to [`ErrorKind::NetworkError`].
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(String),

    #[error("upstream status {0}")]
    Status(u16),

    #[error("invalid response body: {0}")]
    Body(String),
}

impl From<&FetchError> for ErrorKind {
    fn from(err: &FetchError) -> Self {
        ErrorKind::NetworkError(err.to_string())
    }
}
