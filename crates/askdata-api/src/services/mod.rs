pub mod deployment;
pub mod history;
pub mod context;
