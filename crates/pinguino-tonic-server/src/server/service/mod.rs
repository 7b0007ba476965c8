//! gRPC surface of the coordinator process.
//!
//! ## Structure
//!
//! - [`handler`] - `Coordinator` service entry point (`CoordinatorService`).

pub mod handler;
