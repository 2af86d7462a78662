//! Shard maps of the performance builders: sharding their benchmarks from
//! recorded story timing and keeping the maps consistent with the catalog.

mod config;
mod helpers;
mod local_logger;
mod platforms;
mod prelude;
mod timing_data;
mod validator;

#[cfg(test)]
mod test_utils;

pub mod cli;
pub mod logger;

pub use local_logger::clean_logger;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
