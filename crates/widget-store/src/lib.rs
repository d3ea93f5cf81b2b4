mod logging;
pub use logging::init_logging;
mod config;
pub use config::Config;
mod error;
pub use error::StoreError;
pub mod fetch;
pub mod flux;
mod replay;
pub use replay::{PieChartSnapshot, Replay, SearchSnapshot, Snapshot, TableSnapshot};
pub mod widget;

#[cfg(test)]
mod testing;
