mod client;
pub mod repositories;

pub use client::SqliteStore;
