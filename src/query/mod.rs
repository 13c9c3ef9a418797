// Query Processing Module
//
// Execution of compiled PartiQL plans. Parsing and planning happen upstream.

pub mod executor;

// Export key public interfaces
pub use executor::engine::ExecutionEngine;
pub use executor::result::QueryResult;
