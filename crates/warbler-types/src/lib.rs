//! Plain data shared by the persistence layer and the HTTP handlers.
//! Nothing in here touches the database or the network.

pub mod api;
pub mod models;
