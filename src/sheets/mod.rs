//! Remote spreadsheet access: the `SheetStore` trait and its backends.

pub mod a1;
pub mod auth;
pub mod google;
pub mod memory;
pub mod traits;

pub use auth::{ServiceAccount, TokenSource};
pub use google::GoogleSheets;
pub use memory::MemorySheets;
pub use traits::{SheetStore, ValueInput};
