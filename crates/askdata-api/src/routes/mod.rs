pub mod ask;
pub mod chart;
pub mod health;
pub mod settings;
pub mod summary;
pub mod threads;
