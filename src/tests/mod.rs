// src/tests/mod.rs
//! Shared test doubles.

pub mod mocks;
