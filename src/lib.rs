pub mod cli;
pub mod controller;
pub mod inputs;
pub mod ports;
pub mod terminal;
pub mod types;
pub mod utils;
