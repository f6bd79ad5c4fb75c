//! Offline-first asset cache gateway.
//!
//! Sits between a client application and the network: intercepts same-origin
//! GET requests, answers them from a durable local store when it can, falls
//! back to the network (refreshing the store off the response path), and
//! degrades to a designated offline page when neither can answer. The
//! transport delivering requests and the registration of the layer belong to
//! the host; this crate supplies the store, the seeding/activation
//! lifecycle, and the per-request decision policy.

pub mod config;
pub mod gateway;
pub mod net;
pub mod store;
