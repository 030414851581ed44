//! Ports for the admission subsystem.

pub mod outbound;

pub use outbound::GraphSource;
