/// Ids, frame-rate and time helpers.
pub mod core;
/// Crate-wide error taxonomy.
pub mod error;
/// JSON file helpers.
pub mod io;
