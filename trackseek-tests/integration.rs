//! Integration tests for Trackseek
//!
//! Exercise the dispatcher end to end through the Bandcamp provider, with
//! a scripted transport standing in for the network.

#[path = "integration/support.rs"]
mod support;

#[path = "integration/bandcamp_resolution.rs"]
mod bandcamp_resolution;
#[path = "integration/dispatch_contract.rs"]
mod dispatch_contract;
