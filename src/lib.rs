// src/lib.rs

pub mod client;
pub mod config;
pub mod error;
pub mod handlers;
pub mod models;
pub mod routes;
pub mod session;
pub mod state;
pub mod utils;

pub use client::ApiClient;
pub use routes::create_router;
pub use session::{QuizSession, SessionContext};
