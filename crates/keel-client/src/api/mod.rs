//! API endpoint implementations.

mod context;
mod extract;
mod health;

pub use context::ContextApi;
pub use extract::ExtractApi;
pub use health::HealthApi;
