pub mod bus;
pub mod config;
pub mod error;
pub mod events;
pub mod eventstore;
pub mod leader;
pub mod metrics;
pub mod pipeline;
pub mod preprocess;
pub mod publisher;
