pub mod cache;
pub mod collector;
pub mod command;
pub mod kill;
pub mod parse;
pub mod platform;
pub mod process;
pub mod provider;
pub mod snapshot;
