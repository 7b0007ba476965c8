#![doc = include_str!("../README.md")]

mod client;
mod common;

pub use client::*;
pub use common::*;
// Public re-export so downstream crates can reach the domain types via
// `pinguino_tonic_core::pinguino`
pub use pinguino;

pub mod proto {
    tonic::include_proto!("pinguino");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("pinguino_descriptor");
}
