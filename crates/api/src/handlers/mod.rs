pub mod auth;
pub mod resource;
pub mod users;
pub mod views;
