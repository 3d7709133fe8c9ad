// Library crate exposing modules for the binary and integration tests

pub mod frontier;
pub mod github;
pub mod model;
pub mod report;
pub mod repository;
pub mod scanner;
pub mod util;
pub mod worker;
