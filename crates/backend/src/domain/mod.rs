//! Domain types - configuration and request identity
//!
//! These types are shared by both sides of the queue and are independent of
//! how requests are stored on disk.

pub mod config;
pub mod request;
