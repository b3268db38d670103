//! Contrôle d'accès par requête.
//!
//! Un [`Acl`] optionnel est consulté avant tout dispatch vers les handlers
//! d'un service (description, contrôle, événements). Il est partagé par tous
//! les services des devices hébergés dans le contexte ; une requête refusée
//! reçoit un 403 à corps vide.

use std::net::IpAddr;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use once_cell::sync::Lazy;

/// Description d'une requête soumise au contrôle d'accès.
#[derive(Debug, Clone)]
pub struct AclRequest {
    /// UDN du device visé, si connu
    pub device_udn: Option<String>,
    /// Identifiant du service visé, si connu
    pub service_id: Option<String>,
    /// Chemin HTTP servi
    pub path: String,
    /// Adresse IP du pair
    pub peer: IpAddr,
    /// En-tête User-Agent du pair, si présent
    pub user_agent: Option<String>,
}

/// Politique d'accès, synchrone ou asynchrone.
#[async_trait]
pub trait Acl: Send + Sync {
    /// Variante synchrone, utilisée quand [`can_sync`](Acl::can_sync) est vrai.
    fn is_allowed(&self, request: &AclRequest) -> bool;

    /// Vrai si la décision peut être prise sans I/O.
    fn can_sync(&self) -> bool {
        true
    }

    /// Variante asynchrone, pour les politiques qui interrogent un service
    /// externe. Par défaut, délègue à la variante synchrone.
    async fn is_allowed_async(&self, request: &AclRequest) -> bool {
        self.is_allowed(request)
    }
}

static CONTEXT_ACL: Lazy<RwLock<Option<Arc<dyn Acl>>>> = Lazy::new(|| RwLock::new(None));

/// Installe la politique d'accès du contexte.
pub fn set_context_acl(acl: Arc<dyn Acl>) {
    *CONTEXT_ACL.write().unwrap() = Some(acl);
}

/// Retire la politique d'accès.
pub fn clear_context_acl() {
    *CONTEXT_ACL.write().unwrap() = None;
}

/// Évalue la politique du contexte pour une requête.
///
/// Sans politique installée, tout est autorisé.
pub async fn check(request: &AclRequest) -> bool {
    let acl = CONTEXT_ACL.read().unwrap().clone();
    match acl {
        None => true,
        Some(acl) => {
            if acl.can_sync() {
                acl.is_allowed(request)
            } else {
                acl.is_allowed_async(request).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct DenyPeer(IpAddr);

    #[async_trait]
    impl Acl for DenyPeer {
        fn is_allowed(&self, request: &AclRequest) -> bool {
            request.peer != self.0
        }
    }

    fn request(peer: &str) -> AclRequest {
        AclRequest {
            device_udn: None,
            service_id: None,
            path: "/service/x/control".to_string(),
            peer: peer.parse().unwrap(),
            user_agent: None,
        }
    }

    #[tokio::test]
    async fn test_no_acl_allows_everything() {
        clear_context_acl();
        assert!(check(&request("10.0.0.1")).await);
    }

    #[tokio::test]
    async fn test_acl_denies() {
        set_context_acl(Arc::new(DenyPeer("10.0.0.99".parse().unwrap())));
        assert!(check(&request("10.0.0.1")).await);
        assert!(!check(&request("10.0.0.99")).await);
        clear_context_acl();
    }
}
