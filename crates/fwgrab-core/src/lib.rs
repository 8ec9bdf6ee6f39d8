pub mod config;
pub mod logging;

pub mod catalog;
pub mod checksum;
pub mod fetch;
pub mod http;
pub mod pipeline;
pub mod plan;
pub mod source;
pub mod url_model;
