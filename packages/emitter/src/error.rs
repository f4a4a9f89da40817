use thiserror::Error;

/// Errors that can occur when checking on a cancellable operation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// The operation was cancelled through its [`AbortSignal`][crate::AbortSignal].
    #[error(
        "operation was aborted: {}",
        reason.as_deref().unwrap_or("no reason given")
    )]
    Aborted {
        /// The reason given when aborting, if any.
        reason: Option<String>,
    },
}

/// A specialized `Result` type for this crate, returning the crate's [`Error`] type as the error
/// value.
pub(crate) type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[cfg_attr(coverage_nightly, coverage(off))]
mod tests {
    use std::fmt::Debug;

    use static_assertions::assert_impl_all;

    use super::*;

    assert_impl_all!(Error: Send, Sync, Debug);

    #[test]
    fn aborted_display_includes_reason() {
        let error = Error::Aborted {
            reason: Some("user went away".to_string()),
        };

        assert!(error.to_string().contains("user went away"));
    }

    #[test]
    fn aborted_display_without_reason() {
        let error = Error::Aborted { reason: None };

        assert!(!error.to_string().is_empty());
    }
}
