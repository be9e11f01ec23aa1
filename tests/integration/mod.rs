//! Integration tests for relnotes

mod helpers;
mod test_cli;
mod test_harvest;
mod test_pipeline;
