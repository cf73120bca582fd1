//! Command implementations.

mod info;
mod serve;
mod validate;
mod watch;

pub use info::run_info;
pub use serve::run_serve;
pub use validate::run_validate;
pub use watch::run_watch;
