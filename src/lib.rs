pub mod config;
pub mod dispatch;
pub mod headers;
pub mod http;
pub mod job;
pub mod observability;
pub mod processor;
pub mod queue;
pub mod relay;
pub mod reporter;
pub mod runner;
pub mod server;
