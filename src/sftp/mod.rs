//! SFTP Module
//!
//! Remote browsing, bulk operations and the russh-sftp backed file system.

pub mod browser;
pub mod bulk;
pub mod error;
pub mod fs;
pub mod path_utils;
pub mod session;
#[cfg(test)]
pub mod testing;
pub mod types;

pub use browser::{list_entries, Activation, NavigationContext, ParentOutcome, RemoteBrowser};
pub use bulk::{delete_file, delete_many, list_recursive};
pub use error::SftpError;
pub use fs::{RawDirEntry, RemoteConnector, RemoteError, RemoteFs};
pub use session::SftpSession;
pub use types::*;
