pub mod algorithm;
pub mod assignment;
pub mod common;
pub mod config;
pub mod error;
pub mod map;
pub mod reservation;
pub mod resolver;
pub mod scenario;
pub mod solver;
pub mod stat;
