pub mod chat;
pub mod flights;
pub mod health;
