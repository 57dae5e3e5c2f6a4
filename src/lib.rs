pub mod analysis;
pub mod app;
pub mod config;
pub mod errors;
pub mod http;
pub mod observability;
pub mod pipeline;
pub mod source;
pub mod step;
pub mod store;
pub mod util;
