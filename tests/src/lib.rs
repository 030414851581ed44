//! # Size Gate Test Suite
//!
//! End-to-end tests that run the real proxy on loopback sockets, in front of
//! a stub upstream and a stub Kubo RPC API.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs        # Stub servers, graphs and a running gate
//! └── integration/
//!     ├── admission.rs   # 403 / 500 / forward decisions over HTTP
//!     ├── forwarding.rs  # What reaches the upstream and what comes back
//!     ├── concurrency.rs # Many clients asking for the same root
//!     └── kubo.rs        # Full stack against a stub Kubo API
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p sg-tests
//! cargo test -p sg-tests integration::concurrency
//! ```

pub mod fixtures;
pub mod integration;
