pub mod host;
pub mod path;
pub mod process;
pub mod ssh;
