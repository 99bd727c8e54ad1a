pub mod analytics;
pub mod config;
pub mod models;
pub mod redirect;
pub mod region;
pub mod resolver;
pub mod storage;
pub mod visitor;
