pub mod config;
pub mod error;
pub mod executor;
pub mod planner;
pub mod planning;
pub mod request;
pub mod store;
pub mod tools;
