pub mod output;
pub mod sanitize;

pub use sanitize::run_sanitize;
