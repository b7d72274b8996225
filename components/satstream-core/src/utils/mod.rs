pub mod logger;

use hiro_system_kit::slog::Logger;

#[derive(Clone)]
pub struct Context {
    pub logger: Option<Logger>,
    pub tracer: bool,
}

impl Context {
    pub fn empty() -> Context {
        Context {
            logger: None,
            tracer: false,
        }
    }

    pub fn try_log<F>(&self, closure: F)
    where
        F: FnOnce(&Logger),
    {
        if let Some(ref logger) = self.logger {
            closure(logger)
        }
    }

    pub fn expect_logger(&self) -> &Logger {
        self.logger.as_ref().unwrap()
    }
}

/// Exit codes for the indexing service.
pub mod exit_codes {
    /// Normal shutdown.
    pub const OK: i32 = 0;
    /// Fatal invariant violation (e.g. a counter would go negative).
    pub const INVARIANT_VIOLATION: i32 = 1;
    /// Unrecoverable I/O failure after retries.
    pub const IO_FAILURE: i32 = 2;
}
