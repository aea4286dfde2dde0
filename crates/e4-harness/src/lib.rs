//! Deterministic simulation harness for E4 clients.
//!
//! In-process implementations of the Environment and Transport traits for
//! reproducible end-to-end tests: a seeded [`SimEnv`] with a virtual clock, a
//! [`LocalBroker`] with per-connection FIFO inboxes, and drivers that pump
//! broker traffic through client runtimes ([`SimClient`]) or publish commands
//! for an administrator ([`SimAdmin`]).
//!
//! Everything is synchronous. A test decides when each client drains its
//! inbox, so interleavings are explicit and a failing seed replays exactly.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod broker;
pub mod sim_client;
pub mod sim_env;

pub use broker::{BrokerClient, Delivery, LocalBroker};
pub use sim_client::{PumpReport, SimAdmin, SimClient};
pub use sim_env::{SIM_EPOCH, SimEnv};
