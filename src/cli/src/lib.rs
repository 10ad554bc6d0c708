//! ctrlink CLI - query containerd through the shared client.

pub mod commands;
pub mod output;
