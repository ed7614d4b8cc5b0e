#![forbid(unsafe_code)]

//! i2p — convert API collections between Insomnia and Postman.
//!
//! Library entry point exposing the conversion engine. The binary
//! (`main.rs`) is a thin CLI wrapper around [`pipeline::convert`].

pub mod convert;
pub mod error;
pub mod formats;
pub mod model;
pub mod pipeline;
pub mod urls;
