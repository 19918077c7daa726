//! Request handlers for the control-plane endpoints.

pub mod jobs;
pub mod packages;
pub mod scripts;
