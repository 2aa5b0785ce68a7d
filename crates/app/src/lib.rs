#![forbid(unsafe_code)]

pub mod cli;
pub mod logging;
pub mod routes;
pub mod seed;
