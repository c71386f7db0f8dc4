pub mod client;
pub mod config;
pub mod gate;
pub mod guard;
pub mod models;
pub mod runner;
pub mod session;
