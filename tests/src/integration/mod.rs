//! Cross-crate integration tests.

mod admission;
mod concurrency;
mod forwarding;
mod kubo;
