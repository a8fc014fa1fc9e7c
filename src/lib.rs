pub mod api;
pub mod cache;
pub mod commands;
pub mod configuration;
pub mod dates;
pub mod display;
pub mod errors;
pub mod filesystem;
pub mod logging;
pub mod model;
pub mod store;
pub mod sync;
