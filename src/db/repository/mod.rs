//! Repository layer — row-level operations on the requests table.
//!
//! Status transitions are conditional updates keyed on the expected
//! prior status, so two concurrent approvals cannot both succeed.

mod request;

pub use request::*;
