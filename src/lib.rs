//! mediashield: per-app redirect and visibility rules for a shared media storage namespace.

pub mod audit;
pub mod config;
pub mod error;
pub mod identity;
pub mod mime;
pub mod paths;
pub mod pipeline;
pub mod resolver;
pub mod rules;
pub mod visibility;

pub use config::EngineConfig;
pub use error::{EngineError, EngineResult};
pub use pipeline::{Engine, MatchResult};
pub use rules::{RuleSet, RuleStore};

// Test-only printing helper: expands to eprintln! during tests and debug builds.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        if false { let _ = format!($($arg)*); }
    });
}
