//! Convenient re-exports of http types that are part of `schmock`'s public API.
pub use http::{Method, StatusCode};
