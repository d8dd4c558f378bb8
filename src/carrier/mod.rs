//! Translation between the frontend's simplified requests and the UPS APIs.
//!
//! Building requests, normalizing failures and decoding track alerts are all pure
//! (no I/O); `proxy` owns the network calls.

pub mod request;
pub mod response;
pub mod types;
pub mod webhook;
