//! # drover-id
//!
//! Typed identifiers for the records the drover control plane reads and
//! garbage collects.
//!
//! ## ID Format
//!
//! Record IDs use a prefixed format: `{prefix}_{ulid}`
//!
//! Examples:
//! - `eval_01HV4Z2WQXKJNM8GPQY6VBKC3D`
//! - `alloc_01HV4Z3MXNKPQR9HSTZ7WCLD4E`
//! - `node_01HV4Z4NYPLTRS0JTUA8XDME5F`
//!
//! Typing the IDs keeps an allocation ID from ever being passed where an
//! evaluation ID is expected, which matters most on the delete path.
//!
//! [`Index`] is the log index stamped on a record at its last write. It is
//! not an identifier but travels with every record, so it lives here too.

mod error;
mod macros;
mod types;

pub use error::IdError;
pub use types::*;

/// Re-export ulid for consumers that need raw ULID operations
pub use ulid::Ulid;
