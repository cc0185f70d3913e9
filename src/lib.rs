//! Post service with a consistency-preserving cache in front of its resource store.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub(crate) mod util;
