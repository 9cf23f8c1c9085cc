//! CLI command implementations

mod erase;
pub mod layout;
mod list;
pub mod opaque;
mod probe;
mod read;
pub mod unified;
mod verify;
mod write;
pub mod wp;

pub use erase::run_erase;
pub use list::{list_chips, list_programmers};
pub use probe::run_probe;
pub use read::run_read;
pub use verify::run_verify;
pub use write::run_write;
