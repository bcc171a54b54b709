use crate::core::{ErrorKind, LookupError};

/// Map a raw lookup failure onto the user-facing taxonomy.
///
/// Typed variants decide directly; `Other` falls back to message inspection.
pub fn classify(err: &LookupError) -> ErrorKind {
    match err {
        LookupError::Connectivity(_) => ErrorKind::NetworkUnavailable,
        LookupError::TimedOut(_) => ErrorKind::Timeout,
        // 408 Request Timeout, 504 Gateway Timeout
        LookupError::Status { status: 408 | 504 } => ErrorKind::Timeout,
        LookupError::Status { .. } | LookupError::Decode(_) => ErrorKind::Unknown,
        LookupError::Other(msg) => classify_message(msg),
    }
}

pub(crate) fn classify_message(msg: &str) -> ErrorKind {
    let lower = msg.to_lowercase();

    let timeout = ["timed out", "timeout", "deadline has elapsed"];
    if timeout.iter().any(|needle| lower.contains(needle)) {
        return ErrorKind::Timeout;
    }

    let offline = [
        "offline",
        "not connected to the internet",
        "network connection was lost",
        "network is unreachable",
        "no route to host",
        "connection refused",
        "connection reset",
        "dns error",
        "failed to lookup address",
    ];
    if offline.iter().any(|needle| lower.contains(needle)) {
        return ErrorKind::NetworkUnavailable;
    }

    ErrorKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_typed_variants() {
        assert_eq!(
            classify(&LookupError::Connectivity("tcp connect error".into())),
            ErrorKind::NetworkUnavailable
        );
        assert_eq!(
            classify(&LookupError::TimedOut("operation timed out".into())),
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&LookupError::Status { status: 504 }),
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&LookupError::Status { status: 429 }),
            ErrorKind::Unknown
        );
        assert_eq!(
            classify(&LookupError::Decode("expected value".into())),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_opaque_messages() {
        assert_eq!(
            classify(&LookupError::Other(
                "The Internet connection appears to be offline.".into()
            )),
            ErrorKind::NetworkUnavailable
        );
        assert_eq!(
            classify(&LookupError::Other("The request timed out.".into())),
            ErrorKind::Timeout
        );
        assert_eq!(
            classify(&LookupError::Other("error trying to connect: dns error".into())),
            ErrorKind::NetworkUnavailable
        );
        assert_eq!(
            classify(&LookupError::Other("unexpected EOF".into())),
            ErrorKind::Unknown
        );
    }

    #[test]
    fn test_user_messages() {
        assert_eq!(
            ErrorKind::NetworkUnavailable.user_message(),
            "Please check your internet connection and try again."
        );
        assert_eq!(
            ErrorKind::Timeout.user_message(),
            "The search took too long. Please try again."
        );
        assert_eq!(
            ErrorKind::Unknown.user_message(),
            "Something went wrong. Please try again later."
        );
    }
}
