//! HTTP API: invoice parsing, validation and import over JSON.

pub mod app;
