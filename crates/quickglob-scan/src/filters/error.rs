use quickglob_core::{GlobError, Settings};

/// Separates recoverable traversal errors from fatal ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct ErrorFilter {
    suppress_errors: bool,
}

impl ErrorFilter {
    pub fn new(settings: &Settings) -> Self {
        Self {
            suppress_errors: settings.suppress_errors,
        }
    }

    /// An entry that vanished between listing and inspection is never
    /// fatal. Everything else is fatal unless errors are suppressed.
    pub fn is_non_fatal(&self, error: &GlobError) -> bool {
        error.is_not_found() || self.suppress_errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn error(kind: io::ErrorKind) -> GlobError {
        GlobError::io("/tmp/x", io::Error::new(kind, "boom"))
    }

    #[test]
    fn test_not_found_is_non_fatal() {
        let filter = ErrorFilter::new(&Settings::default());
        assert!(filter.is_non_fatal(&error(io::ErrorKind::NotFound)));
        assert!(!filter.is_non_fatal(&error(io::ErrorKind::PermissionDenied)));
    }

    #[test]
    fn test_suppress_errors() {
        let settings = Settings::builder()
            .cwd("/tmp")
            .suppress_errors(true)
            .build()
            .unwrap();
        let filter = ErrorFilter::new(&settings);
        assert!(filter.is_non_fatal(&error(io::ErrorKind::PermissionDenied)));
        assert!(filter.is_non_fatal(&GlobError::Loop {
            path: "/tmp/loop".into()
        }));
    }
}
