//! Command implementations.

pub mod extract;
pub mod init;
pub mod run;
pub mod watch;

pub use self::extract::{execute_extract, extract_files, ExtractedNotice};
pub use self::init::{execute_init, write_default_config};
pub use self::run::{execute_run, run_once};
pub use self::watch::execute_watch;
