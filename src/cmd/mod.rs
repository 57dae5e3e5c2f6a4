//! CLI command implementations.
//!
//! | Module    | Commands handled          |
//! |-----------|---------------------------|
//! | `serve`   | `Serve`                   |
//! | `analyze` | `Analyze`                 |
//! | `status`  | `Status`                  |
//! | `worker`  | `Worker Review`, `Worker Debt` |

pub mod analyze;
pub mod serve;
pub mod status;
pub mod worker;

pub use analyze::cmd_analyze;
pub use serve::cmd_serve;
pub use status::cmd_status;
pub use worker::cmd_worker;
