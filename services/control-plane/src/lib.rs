//! drover control plane library.
//!
//! This crate primarily ships a `drover-control-plane` binary, but we expose
//! the core scheduler and state contracts to enable integration testing and
//! reuse.

pub mod config;
pub mod rpc;
pub mod scheduler;
pub mod state;
pub mod timetable;
