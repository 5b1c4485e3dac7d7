//! API clients for upstream filing data

pub mod sec_edgar;

pub use sec_edgar::{RawFact, SecEdgarClient};
