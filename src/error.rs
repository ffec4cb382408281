//! Sentinel errors shared by every collection and detection entry point, and the translator
//! that turns an engine status triple into one of them.

use crate::engine::{EngineStatus, codes};

/// Errors surfaced by the metrics, quota and runtime entry points.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("operation not supported on this platform")]
    NotSupported,
    #[error("permission denied")]
    PermissionDenied,
    #[error("resource not found")]
    NotFound,
    #[error("invalid parameter")]
    InvalidParam,
    #[error("I/O error")]
    Io,
    #[error("internal error")]
    Internal,
    #[error("probe engine not initialized")]
    NotInitialized,
    #[error("context canceled")]
    Cancelled,
    #[error("context deadline exceeded")]
    DeadlineExceeded,
    /// A failure code the translator does not recognize, kept verbatim.
    #[error("probe engine error (code {code}): {message}")]
    Engine { code: i32, message: String },
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Returns the sentinel for a known engine failure code, or `None` for `OK` and any code
    /// outside the closed set.
    pub fn from_code(code: i32) -> Option<Self> {
        match code {
            codes::NOT_SUPPORTED => Some(Error::NotSupported),
            codes::PERMISSION => Some(Error::PermissionDenied),
            codes::NOT_FOUND => Some(Error::NotFound),
            codes::INVALID_PARAM => Some(Error::InvalidParam),
            codes::IO => Some(Error::Io),
            codes::INTERNAL => Some(Error::Internal),
            _ => None,
        }
    }
}

/// Converts an engine status into `Ok(())` or the matching sentinel error.
///
/// A failed status whose code is not one of the known failure codes (including a failed
/// status that still reports `OK`) becomes [`Error::Engine`] with the raw code and message,
/// so an unexpected code is never mistaken for success.
///
/// # Errors
///
/// Returns the sentinel for `status.code` when `status.success` is false.
pub fn translate(status: &EngineStatus) -> Result<()> {
    if status.success {
        return Ok(());
    }

    match Error::from_code(status.code) {
        Some(err) => Err(err),
        None => Err(Error::Engine {
            code: status.code,
            message: status.message.clone(),
        }),
    }
}

pub trait ResultOkLogExt<T, E> {
    fn ok_log(self) -> Option<T>;
}

impl<T, E> ResultOkLogExt<T, E> for std::result::Result<T, E>
where
    E: std::error::Error,
{
    fn ok_log(self) -> Option<T> {
        match self {
            Ok(ok) => Some(ok),
            Err(err) => {
                log::warn!("{err}");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_translate_success() {
        assert_eq!(translate(&EngineStatus::ok()), Ok(()));
    }

    #[test]
    fn test_translate_known_codes() {
        let cases = [
            (codes::NOT_SUPPORTED, Error::NotSupported),
            (codes::PERMISSION, Error::PermissionDenied),
            (codes::NOT_FOUND, Error::NotFound),
            (codes::INVALID_PARAM, Error::InvalidParam),
            (codes::IO, Error::Io),
            (codes::INTERNAL, Error::Internal),
        ];
        for (code, expected) in cases {
            let status = EngineStatus::failure(code, "ignored");
            assert_eq!(translate(&status), Err(expected));
        }
    }

    #[test]
    fn test_translate_unknown_code_keeps_code_and_message() {
        let status = EngineStatus::failure(42, "disk on fire");
        let err = translate(&status).unwrap_err();
        assert_eq!(
            err,
            Error::Engine {
                code: 42,
                message: "disk on fire".to_owned()
            }
        );
        assert_eq!(err.to_string(), "probe engine error (code 42): disk on fire");
    }

    #[test]
    fn test_translate_failed_status_with_ok_code_is_not_success() {
        let status = EngineStatus::failure(codes::OK, "");
        assert!(matches!(
            translate(&status),
            Err(Error::Engine { code: 0, .. })
        ));
    }

    #[test]
    fn test_from_code_ok_is_none() {
        assert_eq!(Error::from_code(codes::OK), None);
        assert_eq!(Error::from_code(7), None);
    }

    #[test]
    fn test_ok_log() {
        let ok: std::result::Result<u8, Error> = Ok(3);
        assert_eq!(ok.ok_log(), Some(3));
        let err: std::result::Result<u8, Error> = Err(Error::NotFound);
        assert_eq!(err.ok_log(), None);
    }
}
