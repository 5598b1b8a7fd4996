pub mod chat;
pub mod contract;
pub mod events;
pub mod models;
pub mod session;
