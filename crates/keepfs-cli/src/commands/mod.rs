pub mod cat;
pub mod config;
pub mod ls;
pub mod mount;
