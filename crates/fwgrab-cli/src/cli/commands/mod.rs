//! CLI command handlers, one file per command.

mod checksum;
mod download;
mod list;

pub use checksum::run_checksum;
pub use download::run_download;
pub use list::run_list;
