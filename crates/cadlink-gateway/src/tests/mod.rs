//! Test suites for the gateway client.

mod support;
