// Unit tests for crate-private behaviour.
// End-to-end tests against mock HTTP and WebSocket servers are in integration_tests/.

mod config;
mod duplex;
mod state;
mod transport;
