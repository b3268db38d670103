//! Services UPnP hébergés.
//!
//! Un [`Service`] est le modèle immuable d'un service : type, actions et
//! variables d'état. Une [`ServiceInstance`] le porte à l'exécution : elle
//! publie les trois endpoints (SCPD, contrôle, événements), dispatche les
//! actions SOAP vers les handlers applicatifs et notifie les abonnés GENA
//! des changements de variables.

mod eventing;
mod host;
mod instance;

use std::sync::Arc;

use crate::actions::{Action, ActionSet};
use crate::object_set::{Named, ObjectSetError};
use crate::state_variables::{StateVariable, StateVariableSet};

pub use eventing::{
    NotifyFailedCallback, SUBSCRIPTION_TIMEOUT_DEFAULT, SUBSCRIPTION_TIMEOUT_MAX,
    SUBSCRIPTION_TIMEOUT_MIN, SubscriptionSet, build_propertyset, parse_callback_header,
    parse_timeout_header,
};
pub use host::{parse_host_header, validate_host_header};
pub use instance::{METHOD_SUBSCRIBE, METHOD_UNSUBSCRIBE, QueryHandler, ServiceInstance};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("invalid service version: {0}")]
    InvalidVersion(u32),

    #[error("action '{action}' references unknown state variable '{variable}'")]
    UnknownStateVariable { action: String, variable: String },

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("unknown state variable: {0}")]
    UnknownVariable(String),

    #[error(transparent)]
    Duplicate(#[from] ObjectSetError),

    #[error("URL registration failed: {0}")]
    UrlRegistrationError(String),
}

/// Modèle d'un service UPnP.
#[derive(Debug, Clone)]
pub struct Service {
    name: String,
    version: u32,
    service_type_override: Option<String>,
    actions: ActionSet,
    variables: StateVariableSet,
}

impl Named for Service {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Service {
    /// Crée un service en version 1.
    ///
    /// `name` est le segment de type (ex: "AVTransport") ; il sert aussi de
    /// segment de route et d'identifiant de service.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            version: 1,
            service_type_override: None,
            actions: ActionSet::new(),
            variables: StateVariableSet::new(),
        }
    }

    pub fn set_version(&mut self, version: u32) -> Result<(), ServiceError> {
        if version == 0 {
            return Err(ServiceError::InvalidVersion(version));
        }
        self.version = version;
        Ok(())
    }

    /// Remplace l'URN de type complet (pour les services hors schéma
    /// upnp-org).
    pub fn set_service_type(&mut self, urn: impl Into<String>) {
        self.service_type_override = Some(urn.into());
    }

    /// Type de service.
    ///
    /// Format par défaut : `urn:schemas-upnp-org:service:{name}:{version}`
    pub fn service_type(&self) -> String {
        match &self.service_type_override {
            Some(urn) => urn.clone(),
            None => format!(
                "urn:schemas-upnp-org:service:{}:{}",
                self.name, self.version
            ),
        }
    }

    /// Identifiant de service.
    ///
    /// Format : `urn:upnp-org:serviceId:{name}`
    pub fn service_id(&self) -> String {
        format!("urn:upnp-org:serviceId:{}", self.name)
    }

    /// Déclare une variable d'état.
    pub fn add_variable(&mut self, variable: StateVariable) -> Result<(), ServiceError> {
        self.variables.insert(Arc::new(variable))?;
        Ok(())
    }

    /// Déclare une action.
    ///
    /// Chaque argument doit référencer une variable d'état déjà déclarée.
    pub fn add_action(&mut self, action: Action) -> Result<(), ServiceError> {
        for argument in action.arguments() {
            let variable = argument.state_variable().name();
            if !self.variables.contains(variable) {
                return Err(ServiceError::UnknownStateVariable {
                    action: action.name().to_string(),
                    variable: variable.to_string(),
                });
            }
        }
        self.actions.insert(Arc::new(action))?;
        Ok(())
    }

    pub fn actions(&self) -> &ActionSet {
        &self.actions
    }

    pub fn variables(&self) -> &StateVariableSet {
        &self.variables
    }

    pub fn get_action(&self, name: &str) -> Option<Arc<Action>> {
        self.actions.get(name)
    }

    pub fn get_variable(&self, name: &str) -> Option<Arc<StateVariable>> {
        self.variables.get(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::actions::Argument;
    use crate::values::VarType;

    #[test]
    fn test_service_type_format() {
        let mut service = Service::new("AVTransport");
        assert_eq!(
            service.service_type(),
            "urn:schemas-upnp-org:service:AVTransport:1"
        );
        service.set_version(2).unwrap();
        assert_eq!(
            service.service_type(),
            "urn:schemas-upnp-org:service:AVTransport:2"
        );
        assert_eq!(
            service.service_id(),
            "urn:upnp-org:serviceId:AVTransport"
        );
    }

    #[test]
    fn test_version_zero_invalid() {
        let mut service = Service::new("X");
        assert!(matches!(
            service.set_version(0),
            Err(ServiceError::InvalidVersion(0))
        ));
    }

    #[test]
    fn test_action_requires_known_variables() {
        let mut service = Service::new("RenderingControl");
        let ghost = Arc::new(StateVariable::new("Ghost", VarType::String));

        let action = Action::new("GetGhost")
            .add_argument(Argument::new_out("Value", ghost));
        assert!(matches!(
            service.add_action(action),
            Err(ServiceError::UnknownStateVariable { .. })
        ));

        service
            .add_variable(StateVariable::new("Volume", VarType::UI2))
            .unwrap();
        let volume = service.get_variable("Volume").unwrap();
        service
            .add_action(Action::new("GetVolume").add_argument(Argument::new_out(
                "CurrentVolume",
                volume,
            )))
            .unwrap();
        assert!(service.get_action("GetVolume").is_some());
    }
}
