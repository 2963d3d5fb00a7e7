//! Parse diagnostics routing
//!
//! Parser providers and the schema validator never decide on their own
//! whether a diagnostic aborts the parse: they report it to an
//! [`ErrorHandler`]. Warnings and recoverable errors continue unless the
//! handler returns `Err`; fatal errors abort regardless.

use crate::error::ParseError;

/// Receiver for diagnostics raised while a document is built
pub trait ErrorHandler {
    /// A condition that does not affect the resulting tree
    fn warning(&mut self, warning: &ParseError) {
        tracing::warn!("{}", warning);
    }

    /// A recoverable error such as a schema violation
    ///
    /// Returning `Err` aborts the parse with that error.
    fn error(&mut self, error: ParseError) -> Result<(), ParseError>;

    /// A well-formedness error; parsing stops after this call whatever it returns
    fn fatal_error(&mut self, error: ParseError) -> Result<(), ParseError> {
        Err(error)
    }
}

/// Handler used when the caller supplies none: every error aborts
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultErrorHandler;

impl ErrorHandler for DefaultErrorHandler {
    fn error(&mut self, error: ParseError) -> Result<(), ParseError> {
        Err(error)
    }
}

/// Handler that records warnings and recoverable errors and lets parsing continue
#[derive(Debug, Default, Clone)]
pub struct CollectingErrorHandler {
    warnings: Vec<ParseError>,
    errors: Vec<ParseError>,
}

impl CollectingErrorHandler {
    /// Create an empty collector
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded warnings
    pub fn warnings(&self) -> &[ParseError] {
        &self.warnings
    }

    /// Recorded errors, fatal ones included
    pub fn errors(&self) -> &[ParseError] {
        &self.errors
    }

    /// Whether any error was recorded
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }

    /// Consume the collector, returning `(warnings, errors)`
    pub fn into_report(self) -> (Vec<ParseError>, Vec<ParseError>) {
        (self.warnings, self.errors)
    }
}

impl ErrorHandler for CollectingErrorHandler {
    fn warning(&mut self, warning: &ParseError) {
        tracing::debug!("collected warning: {}", warning);
        self.warnings.push(warning.clone());
    }

    fn error(&mut self, error: ParseError) -> Result<(), ParseError> {
        tracing::debug!("collected error: {}", error);
        self.errors.push(error);
        Ok(())
    }

    fn fatal_error(&mut self, error: ParseError) -> Result<(), ParseError> {
        self.errors.push(error.clone());
        Err(error)
    }
}

/// Report a fatal error and produce the error that ends the parse
pub(crate) fn raise_fatal(handler: &mut dyn ErrorHandler, error: ParseError) -> ParseError {
    match handler.fatal_error(error.clone()) {
        Err(e) => e,
        Ok(()) => error,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_handler_raises_errors() {
        let mut handler = DefaultErrorHandler;
        assert!(handler.error(ParseError::validation("bad")).is_err());
        assert!(handler.fatal_error(ParseError::syntax("worse")).is_err());
    }

    #[test]
    fn test_collecting_handler_keeps_going() {
        let mut handler = CollectingErrorHandler::new();
        handler.warning(&ParseError::syntax("doctype ignored"));
        assert!(handler.error(ParseError::validation("bad")).is_ok());
        assert!(handler.has_errors());

        let (warnings, errors) = handler.into_report();
        assert_eq!(warnings.len(), 1);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn test_fatal_error_always_aborts() {
        struct Lenient;
        impl ErrorHandler for Lenient {
            fn error(&mut self, _error: ParseError) -> Result<(), ParseError> {
                Ok(())
            }
            fn fatal_error(&mut self, _error: ParseError) -> Result<(), ParseError> {
                Ok(())
            }
        }

        let err = raise_fatal(&mut Lenient, ParseError::syntax("unclosed"));
        assert_eq!(err.message, "unclosed");

        let mut collector = CollectingErrorHandler::new();
        raise_fatal(&mut collector, ParseError::syntax("unclosed"));
        assert_eq!(collector.errors().len(), 1);
    }
}
