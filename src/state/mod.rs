//! State module for tracking frontier progress
//!
//! `FrontierStatus` is the lifecycle of a URL in the crawl queue:
//! pending → in_flight → completed / failed / depth_exceeded.

mod frontier_status;

pub use frontier_status::FrontierStatus;
