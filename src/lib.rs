pub mod app;
pub mod classify;
pub mod config;
pub mod domain;
pub mod download;
pub mod error;
pub mod extract;
pub mod filter;
pub mod layout;
pub mod manifest;
pub mod metadata;
pub mod output;
pub mod report;
pub mod resolve;
