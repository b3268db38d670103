//! Trait d'enregistrement des endpoints UPnP sur un serveur web.
//!
//! Le trait [`UpnpServer`] définit l'interface minimale qu'un serveur HTTP
//! doit fournir pour que devices et services publient leurs URLs sans
//! dépendre d'une implémentation particulière. L'implémentation concrète pour
//! [`ravserver::Server`] (Axum) est fournie ici.

use std::future::Future;
use std::net::SocketAddr;
use std::pin::Pin;
use std::sync::{Arc, RwLock};

use axum::extract::State;

/// Réponse HTTP (basée sur Axum).
pub type Response = axum::response::Response;

/// En-têtes HTTP (basés sur Axum).
pub type HeaderMap = axum::http::HeaderMap;

/// Requête HTTP complète (basée sur Axum).
pub type Request = axum::extract::Request<axum::body::Body>;

/// Serveur web capable de porter des endpoints UPnP.
///
/// Trois formes de handlers :
///
/// 1. **`add_handler`** : GET sans état (descriptions XML)
/// 2. **`add_post_handler_with_state`** : POST avec état (contrôle SOAP)
/// 3. **`add_handler_with_state`** : toutes méthodes avec état
///    (SUBSCRIBE/UNSUBSCRIBE)
pub trait UpnpServer: Send + Sync {
    /// Ajoute un handler GET pour un chemin donné.
    fn add_handler<F, Fut>(
        &mut self,
        path: &str,
        handler: F,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>
    where
        F: Fn() -> Fut + Send + Sync + 'static + Clone,
        Fut: Future<Output = Response> + Send + 'static;

    /// Ajoute un handler POST avec état et accès complet à la requête.
    fn add_post_handler_with_state<S>(
        &mut self,
        path: &str,
        handler: fn(State<S>, HeaderMap, Request) -> Pin<Box<dyn Future<Output = Response> + Send>>,
        state: S,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>
    where
        S: Clone + Send + Sync + 'static;

    /// Ajoute un handler avec état, toutes méthodes HTTP confondues.
    ///
    /// Nécessaire pour les méthodes d'extension GENA (SUBSCRIBE, UNSUBSCRIBE).
    fn add_handler_with_state<S>(
        &mut self,
        path: &str,
        handler: fn(State<S>, HeaderMap, Request) -> Pin<Box<dyn Future<Output = Response> + Send>>,
        state: S,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>
    where
        S: Clone + Send + Sync + 'static;

    /// Handle partagé sur l'adresse liée, pour la validation de l'en-tête
    /// Host des requêtes entrantes.
    fn bound_addr(&self) -> Arc<RwLock<Option<SocketAddr>>>;

    /// URL de base du serveur.
    fn base_url(&self) -> String;
}

impl UpnpServer for ravserver::Server {
    fn add_handler<F, Fut>(
        &mut self,
        path: &str,
        handler: F,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>
    where
        F: Fn() -> Fut + Send + Sync + 'static + Clone,
        Fut: Future<Output = Response> + Send + 'static,
    {
        let path = path.to_string();
        Box::pin(async move {
            ravserver::Server::add_handler(self, &path, handler).await;
        })
    }

    fn add_post_handler_with_state<S>(
        &mut self,
        path: &str,
        handler: fn(State<S>, HeaderMap, Request) -> Pin<Box<dyn Future<Output = Response> + Send>>,
        state: S,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>
    where
        S: Clone + Send + Sync + 'static,
    {
        let path = path.to_string();

        let wrapper = move |State(s): State<S>,
                            headers: HeaderMap,
                            req: Request|
              -> Pin<Box<dyn Future<Output = Response> + Send>> {
            handler(State(s), headers, req)
        };

        Box::pin(async move {
            ravserver::Server::add_post_handler_with_state(self, &path, wrapper, state).await;
        })
    }

    fn add_handler_with_state<S>(
        &mut self,
        path: &str,
        handler: fn(State<S>, HeaderMap, Request) -> Pin<Box<dyn Future<Output = Response> + Send>>,
        state: S,
    ) -> Pin<Box<dyn Future<Output = ()> + Send + '_>>
    where
        S: Clone + Send + Sync + 'static,
    {
        let path = path.to_string();

        let wrapper = move |State(s): State<S>,
                            headers: HeaderMap,
                            req: Request|
              -> Pin<Box<dyn Future<Output = Response> + Send>> {
            handler(State(s), headers, req)
        };

        Box::pin(async move {
            ravserver::Server::add_handler_with_state(self, &path, wrapper, state).await;
        })
    }

    fn bound_addr(&self) -> Arc<RwLock<Option<SocketAddr>>> {
        ravserver::Server::bound_addr(self)
    }

    fn base_url(&self) -> String {
        ravserver::Server::base_url(self)
    }
}
