//! tradebot — shared engine for independent trading strategies.
//!
//! Hexagonal architecture: pure logic in [`domain`], port traits in [`ports`],
//! services that drive the ports in [`application`], concrete implementations
//! in [`adapters`].

pub mod domain;
pub mod ports;
pub mod application;
pub mod adapters;
pub mod cli;
