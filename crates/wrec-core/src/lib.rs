pub mod config;
pub mod logging;

pub mod checksum;
pub mod error;
pub mod filter;
pub mod har;
pub mod record;
pub mod size;
pub mod sort;
pub mod store;
pub mod view;
