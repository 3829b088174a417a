//! ABOUTME: Library half of the exporter binary
//! ABOUTME: Exposes the demo pool so it can be tested and wired from main

pub mod demo_pool;

pub use demo_pool::{spawn_workers, DemoPool, Lease};
