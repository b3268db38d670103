//! # Module Server - API de haut niveau pour Axum
//!
//! Fournit une abstraction simple pour créer le serveur HTTP qui porte les
//! endpoints UPnP, en cachant la configuration du routage Axum.
//!
//! Les routes doivent être enregistrées **avant** l'appel à [`Server::start`] :
//! le router est figé au démarrage.

use std::net::SocketAddr;
use std::sync::{Arc, RwLock as StdRwLock};

use axum::Router;
use axum::handler::Handler;
use axum::routing::{any, get, post};
use serde::Serialize;
use tokio::{sync::RwLock, task::JoinHandle};
use tracing::{error, info};

use crate::config::ServerConfig;

/// Info serveur sérialisable
#[derive(Clone, Serialize)]
pub struct ServerInfo {
    /// Nom du serveur
    pub name: String,
    /// URL de base
    pub base_url: String,
    /// Port HTTP
    pub http_port: u16,
}

/// Serveur principal
pub struct Server {
    name: String,
    host: String,
    http_port: u16,
    router: Arc<RwLock<Router>>,
    /// Adresse effectivement liée, renseignée par `start()`.
    ///
    /// Partagée avec les handlers qui doivent valider l'en-tête Host.
    bound: Arc<StdRwLock<Option<SocketAddr>>>,
    join_handle: Option<JoinHandle<()>>,
}

impl Server {
    /// Crée une nouvelle instance de serveur.
    ///
    /// # Arguments
    ///
    /// * `name` - Nom du serveur (pour les logs)
    /// * `host` - Adresse d'écoute (ex: "127.0.0.1")
    /// * `http_port` - Port HTTP (0 = port éphémère)
    pub fn new(name: impl Into<String>, host: impl Into<String>, http_port: u16) -> Self {
        Self {
            name: name.into(),
            host: host.into(),
            http_port,
            router: Arc::new(RwLock::new(Router::new())),
            bound: Arc::new(StdRwLock::new(None)),
            join_handle: None,
        }
    }

    /// Crée un serveur depuis la configuration (fichier + environnement).
    pub fn new_configured() -> Self {
        let config = ServerConfig::from_env();
        Self::from_config(&config)
    }

    pub fn from_config(config: &ServerConfig) -> Self {
        Self::new(config.name.clone(), config.host.clone(), config.port)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// URL de base du serveur. Après `start()`, reflète le port réellement lié.
    pub fn base_url(&self) -> String {
        let port = self
            .bound
            .read()
            .unwrap()
            .map(|addr| addr.port())
            .unwrap_or(self.http_port);
        format!("http://{}:{}", self.host, port)
    }

    pub fn info(&self) -> ServerInfo {
        ServerInfo {
            name: self.name.clone(),
            base_url: self.base_url(),
            http_port: self
                .bound
                .read()
                .unwrap()
                .map(|addr| addr.port())
                .unwrap_or(self.http_port),
        }
    }

    /// Handle partagé sur l'adresse liée.
    ///
    /// Vide tant que `start()` n'a pas été appelé. Les handlers UPnP le
    /// conservent pour valider les en-têtes Host des requêtes entrantes.
    pub fn bound_addr(&self) -> Arc<StdRwLock<Option<SocketAddr>>> {
        Arc::clone(&self.bound)
    }

    /// Ajoute un handler GET pour un chemin donné.
    pub async fn add_handler<H, T>(&mut self, path: &str, handler: H)
    where
        H: Handler<T, ()>,
        T: 'static,
    {
        let route = Router::new().route("/", get(handler));

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest(path, route);
    }

    /// Ajoute un handler avec state, toutes méthodes confondues.
    ///
    /// Les méthodes d'extension HTTP (SUBSCRIBE, UNSUBSCRIBE, NOTIFY) passent
    /// par cette route ; le handler fait son propre dispatch sur la méthode.
    pub async fn add_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S>,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", any(handler)).with_state(state);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest(path, route);
    }

    /// Ajoute un handler POST avec state.
    pub async fn add_post_handler_with_state<H, T, S>(&mut self, path: &str, handler: H, state: S)
    where
        H: Handler<T, S>,
        T: 'static,
        S: Clone + Send + Sync + 'static,
    {
        let route = Router::new().route("/", post(handler)).with_state(state);

        let mut r = self.router.write().await;
        *r = std::mem::take(&mut *r).nest(path, route);
    }

    /// Ajoute un router complet.
    ///
    /// - Si `path` commence par '/', il est fusionné à la racine.
    /// - Sinon, il est monté sous le sous-chemin donné.
    pub async fn add_router(&mut self, path: &str, route: Router) {
        let mut r = self.router.write().await;

        let current = std::mem::take(&mut *r);

        let combined = if path.starts_with('/') {
            current.merge(route)
        } else {
            let normalized = format!("/{}", path.trim_start_matches('/'));
            current.nest(&normalized, route)
        };

        *r = combined;
    }

    /// Démarre le serveur et retourne l'adresse liée.
    ///
    /// Le port 0 est remplacé par le port éphémère choisi par l'OS.
    pub async fn start(&mut self) -> std::io::Result<SocketAddr> {
        let addr = format!("{}:{}", self.host, self.http_port);
        let listener = tokio::net::TcpListener::bind(&addr).await?;
        let local = listener.local_addr()?;

        *self.bound.write().unwrap() = Some(local);

        let router = {
            let mut r = self.router.write().await;
            std::mem::take(&mut *r)
        };

        let name = self.name.clone();
        let handle = tokio::spawn(async move {
            // connect-info pour que les handlers voient l'adresse du pair
            let service = router.into_make_service_with_connect_info::<SocketAddr>();
            if let Err(e) = axum::serve(listener, service).await {
                error!("HTTP server {} stopped with error: {}", name, e);
            }
        });
        self.join_handle = Some(handle);

        info!("🌐 HTTP server {} listening on {}", self.name, local);
        Ok(local)
    }

    /// Attend l'arrêt du serveur.
    pub async fn wait(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            let _ = handle.await;
        }
    }

    /// Arrête le serveur.
    pub fn stop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            handle.abort();
            info!("HTTP server {} stopped", self.name);
        }
        *self.bound.write().unwrap() = None;
    }
}

impl Drop for Server {
    fn drop(&mut self) {
        if let Some(handle) = self.join_handle.take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_start_reports_bound_port() {
        let mut server = Server::new("test", "127.0.0.1", 0);
        server
            .add_handler("/ping", || async { "pong" })
            .await;

        let addr = server.start().await.unwrap();
        assert_ne!(addr.port(), 0);
        assert!(server.base_url().ends_with(&addr.port().to_string()));

        let bound = server.bound_addr();
        assert_eq!(*bound.read().unwrap(), Some(addr));

        server.stop();
    }

    #[tokio::test]
    async fn test_routes_are_served() {
        let mut server = Server::new("test", "127.0.0.1", 0);
        server.add_handler("/hello", || async { "world" }).await;
        let addr = server.start().await.unwrap();

        let body = tokio::task::spawn_blocking(move || {
            let mut response = ureq::get(format!("http://{}/hello", addr)).call().unwrap();
            response.body_mut().read_to_string().unwrap()
        })
        .await
        .unwrap();

        assert_eq!(body, "world");
        server.stop();
    }
}
