pub mod api;
pub mod clients;
pub mod config;
pub mod dead_letter;
pub mod dispatcher;
pub mod models;
pub mod processor;
pub mod queue;
pub mod retry;
pub mod senders;
pub mod templates;
