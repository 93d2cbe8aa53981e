mod config;
mod env_var;
mod opts;

pub use config::{Config, get_or_create_config};
pub use env_var::EnvVar;
pub use opts::Opts;
