//! Process exit codes
//!
//! 0 success, 1 general error, 2 usage error, 3 network error,
//! 4 authentication error, 5 not found.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    UsageError = 2,
    NetworkError = 3,
    AuthError = 4,
    NotFound = 5,
}

impl ExitCode {
    /// Map a library error code; unknown values become `GeneralError`
    pub fn from_i32(code: i32) -> Self {
        match code {
            0 => ExitCode::Success,
            2 => ExitCode::UsageError,
            3 => ExitCode::NetworkError,
            4 => ExitCode::AuthError,
            5 => ExitCode::NotFound,
            _ => ExitCode::GeneralError,
        }
    }

    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

impl From<ExitCode> for std::process::ExitCode {
    fn from(code: ExitCode) -> Self {
        std::process::ExitCode::from(code.as_i32() as u8)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_known_codes() {
        for code in [
            ExitCode::Success,
            ExitCode::GeneralError,
            ExitCode::UsageError,
            ExitCode::NetworkError,
            ExitCode::AuthError,
            ExitCode::NotFound,
        ] {
            assert_eq!(ExitCode::from_i32(code.as_i32()), code);
        }
    }

    #[test]
    fn test_unknown_code_is_general() {
        assert_eq!(ExitCode::from_i32(42), ExitCode::GeneralError);
        assert_eq!(ExitCode::from_i32(-1), ExitCode::GeneralError);
    }

    #[test]
    fn test_library_error_mapping() {
        let err = bkt_core::Error::Auth("expired".into());
        assert_eq!(ExitCode::from_i32(err.exit_code()), ExitCode::AuthError);
    }
}
