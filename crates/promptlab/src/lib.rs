#![doc = include_str!("../../../README.md")]
//!

//! promptlab: prompt playground state and experiment comparison.
//!
//! This crate re-exports [`promptlab_core`]; the `plab` binary lives in
//! `promptlab-cli`.

pub use promptlab_core::*;
