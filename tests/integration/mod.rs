//! Integration tests for Endpoint Admin
//!
//! These tests drive the HTTP router and the dashboard data layer against
//! local upstreams and an in-memory remote store.

mod health_tests;
mod proxy_tests;
