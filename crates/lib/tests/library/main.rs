//! Integration tests for extractify-lib.

mod common;
mod extraction_tests;
