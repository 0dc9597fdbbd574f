// pii-mask/src/utils/mod.rs
pub mod config;
pub mod input;
