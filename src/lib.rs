// src/lib.rs

pub mod config;
pub mod error;
pub mod view;

pub mod models {
    pub mod api;
    pub mod chat;
    pub mod dispute;
}

pub mod services {
    pub mod backend_api;
    pub mod dispute_session;
    pub mod message_store;
    pub mod notifications;
    pub mod realtime;
    pub mod resolution;
    pub mod socket_io;
    pub mod submission;
}

pub use config::ConsoleConfig;
pub use error::{ConsoleError, Result};
