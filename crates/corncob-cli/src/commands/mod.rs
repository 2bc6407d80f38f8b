pub mod add;
pub mod clone;
pub mod config;
pub mod fetch;
pub mod login;
pub mod merge;
pub mod push;
pub mod remove;
