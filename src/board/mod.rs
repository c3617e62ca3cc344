//! Board records: schema mapping, row location, writes and the audit trail.

pub mod audit;
pub mod fields;
pub mod locator;
pub mod schema;
pub mod writer;

pub use audit::{AuditEvent, AuditLog};
pub use schema::{HeaderIndex, build_header_index, normalize_header_label};
pub use writer::{RecordWriter, WriteAction, WriteMode, WriteOutcome, WriteRequest};
