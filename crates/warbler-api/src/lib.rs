pub mod account;
pub mod auth;
pub mod error;
pub mod extract;
pub mod flash;
pub mod likes;
pub mod messages;
pub mod middleware;
pub mod routes;
pub mod session;
pub mod state;
pub mod users;
pub mod views;
