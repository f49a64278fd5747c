//! Error handling foundation for coachdesk.
//!
//! Only the `Result` alias lives here. Each crate defines its own error
//! enums and wraps them in a rootcause `Report` where they cross an I/O seam.

use rootcause::Report;

/// A Result type alias using rootcause's Report for error handling.
pub type Result<T, C> = std::result::Result<T, Report<C>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug)]
    struct Boom;

    impl std::fmt::Display for Boom {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            write!(f, "boom")
        }
    }

    impl std::error::Error for Boom {}

    #[test]
    fn result_type_works() {
        let ok: Result<i32, Boom> = Ok(42);
        assert_eq!(ok.expect("should be ok"), 42);
    }

    #[test]
    fn error_converts_into_report() {
        fn fails() -> Result<(), Boom> {
            Err(Boom)?;
            Ok(())
        }
        assert!(fails().is_err());
    }
}
