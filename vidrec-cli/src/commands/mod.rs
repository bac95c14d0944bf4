//! CLI command implementations

mod config;
mod formats;
mod interactive;
mod record;
mod runtime;

pub use config::{ConfigArgs, config};
pub use formats::{FormatsArgs, formats};
pub use interactive::interactive;
pub use record::{RecordArgs, record};
pub use runtime::{Context, RuntimeArgs};
