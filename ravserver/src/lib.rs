//! # ravserver - Serveur HTTP minimal pour UPnP
//!
//! Fine surcouche d'Axum utilisée par `ravupnp` pour publier les endpoints
//! UPnP (description, SCPD, contrôle SOAP, événements GENA). Le serveur reste
//! agnostique du protocole : il ne connaît que des routes et des handlers.

mod config;
mod server;

pub use config::ServerConfig;
pub use server::{Server, ServerInfo};
