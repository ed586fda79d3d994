pub mod pipeline;
pub mod runtime;
pub mod server;

pub use server::{client_request, run_daemon};
