//! Invocation d'action côté serveur.
//!
//! Une [`ActionInvocation`] est construite par le dispatcher de contrôle à
//! partir de la requête SOAP, traverse le handler applicatif, puis est
//! finalisée en réponse HTTP. Après [`return_error`](ActionInvocation::return_error),
//! le corps de réponse est figé : les `set` suivants sont ignorés.

use tracing::warn;

use crate::errors::ControlError;
use crate::soap::{self, build_soap_fault};
use crate::values::{Value, ValueError, VarType};

/// Statut d'une invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvocationStatus {
    /// Le handler n'a pas encore statué
    Pending,
    Success,
    Error(u32),
}

/// Invocation d'action en cours de traitement.
#[derive(Debug)]
pub struct ActionInvocation {
    name: String,
    service_type: String,
    /// Arguments IN, dans l'ordre de la requête
    args: Vec<(String, String)>,
    locales: Vec<String>,
    accept_gzip: bool,
    /// Fragment de réponse accumulé (arguments OUT, ou Fault après erreur)
    response: String,
    status: InvocationStatus,
}

impl ActionInvocation {
    pub fn new(
        name: impl Into<String>,
        service_type: impl Into<String>,
        args: Vec<(String, String)>,
        locales: Vec<String>,
        accept_gzip: bool,
    ) -> Self {
        Self {
            name: name.into(),
            service_type: service_type.into(),
            args,
            locales,
            accept_gzip,
            response: String::new(),
            status: InvocationStatus::Pending,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn status(&self) -> InvocationStatus {
        self.status
    }

    /// Nombre d'arguments IN reçus.
    pub fn argument_count(&self) -> usize {
        self.args.len()
    }

    pub fn accepts_gzip(&self) -> bool {
        self.accept_gzip
    }

    /// Locales préférées du client, par ordre de préférence.
    pub fn get_locales(&self) -> &[String] {
        &self.locales
    }

    /// Valeur brute d'un argument.
    pub fn get_str(&self, name: &str) -> Option<&str> {
        self.args
            .iter()
            .find(|(arg_name, _)| arg_name == name)
            .map(|(_, value)| value.as_str())
    }

    /// Valeur typée d'un argument.
    ///
    /// Un argument absent vaut zéro du type demandé, avec un avertissement ;
    /// une valeur inconvertible est une erreur que le handler transforme
    /// typiquement en 402.
    pub fn get(&self, name: &str, var_type: VarType) -> Result<Value, ValueError> {
        match self.get_str(name) {
            Some(raw) => Value::from_wire(raw, var_type),
            None => {
                warn!(
                    action = self.name.as_str(),
                    argument = name,
                    "Missing argument in request, returning zero value"
                );
                Ok(Value::zero(var_type))
            }
        }
    }

    /// Ajoute un argument de sortie à la réponse.
    pub fn set(&mut self, name: &str, value: &Value) {
        if matches!(self.status, InvocationStatus::Error(_)) {
            warn!(
                action = self.name.as_str(),
                "set() after return_error() is not allowed"
            );
            return;
        }
        soap::append_argument(&mut self.response, name, &value.to_wire());
    }

    /// Termine l'invocation en succès.
    pub fn return_success(&mut self) {
        if matches!(self.status, InvocationStatus::Error(_)) {
            warn!(
                action = self.name.as_str(),
                "return_success() after return_error() ignored"
            );
            return;
        }
        self.status = InvocationStatus::Success;
    }

    /// Termine l'invocation sur une erreur UPnP.
    ///
    /// Pour les codes 401, 402, 403 et 501 la description standard est
    /// utilisée si aucune n'est fournie. Le corps accumulé est remplacé par
    /// le Fault et gelé.
    pub fn return_error(&mut self, code: u32, description: Option<&str>) {
        let description = description
            .or_else(|| ControlError::default_description(code))
            .unwrap_or("Error");

        self.status = InvocationStatus::Error(code);
        self.response = build_soap_fault(code, description);
    }

    /// Produit le statut HTTP et le corps de réponse.
    ///
    /// Une invocation restituée sans statut explicite est un succès : les
    /// arguments posés par `set` partent dans la réponse.
    pub fn finalize(self) -> (u16, String) {
        match self.status {
            InvocationStatus::Error(_) => (500, self.response),
            InvocationStatus::Success | InvocationStatus::Pending => {
                let response_name = format!("{}Response", self.name);
                let mut body = String::new();
                let header_pos = soap::begin_envelope(&mut body);
                body.push_str(&self.response);
                soap::end_envelope(&mut body, &response_name);
                body.insert_str(
                    header_pos,
                    &soap::action_open_tag(&response_name, &self.service_type),
                );
                (200, body)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::soap::{SoapFault, parse_soap_envelope};

    fn invocation() -> ActionInvocation {
        ActionInvocation::new(
            "Browse",
            "urn:schemas-upnp-org:service:ContentDirectory:1",
            vec![
                ("ObjectID".to_string(), "0".to_string()),
                ("RequestedCount".to_string(), "25".to_string()),
            ],
            vec!["fr_FR".to_string()],
            false,
        )
    }

    #[test]
    fn test_get_typed_arguments() {
        let invocation = invocation();
        assert_eq!(
            invocation.get("ObjectID", VarType::String).unwrap(),
            Value::String("0".to_string())
        );
        assert_eq!(
            invocation.get("RequestedCount", VarType::UI4).unwrap(),
            Value::UI4(25)
        );
        // Absent : zéro + warning
        assert_eq!(
            invocation.get("Missing", VarType::UI4).unwrap(),
            Value::UI4(0)
        );
        // Inconvertible : erreur
        assert!(invocation.get("ObjectID", VarType::UI4).is_err());
    }

    #[test]
    fn test_success_response_envelope() {
        let mut invocation = invocation();
        invocation.set("Result", &Value::String("Hello".to_string()));
        invocation.set("NumberReturned", &Value::UI4(1));
        invocation.return_success();

        let (status, body) = invocation.finalize();
        assert_eq!(status, 200);
        assert!(body.contains(
            "<u:BrowseResponse xmlns:u=\"urn:schemas-upnp-org:service:ContentDirectory:1\">"
        ));
        assert!(body.contains("<Result>Hello</Result>"));
        assert!(body.ends_with("</u:BrowseResponse></s:Body></s:Envelope>"));
    }

    #[test]
    fn test_pending_finalizes_as_success() {
        let (status, body) = invocation().finalize();
        assert_eq!(status, 200);
        assert!(body.contains("<u:BrowseResponse"));
    }

    #[test]
    fn test_error_freezes_response() {
        let mut invocation = invocation();
        invocation.set("Result", &Value::String("partial".to_string()));
        invocation.return_error(402, None);
        // Ignoré : la réponse est gelée
        invocation.set("Result", &Value::String("late".to_string()));
        invocation.return_success();

        let (status, body) = invocation.finalize();
        assert_eq!(status, 500);
        assert!(!body.contains("partial"));
        assert!(!body.contains("late"));

        let envelope = parse_soap_envelope(body.as_bytes()).unwrap();
        let fault = SoapFault::from_body(&envelope.body).unwrap();
        let error = fault.upnp_error.unwrap();
        assert_eq!(error.code, 402);
        assert_eq!(error.description, "Invalid Args");
    }

    #[test]
    fn test_custom_error_description() {
        let mut invocation = invocation();
        invocation.return_error(714, Some("No such object"));

        let (_, body) = invocation.finalize();
        let envelope = parse_soap_envelope(body.as_bytes()).unwrap();
        let error = SoapFault::from_body(&envelope.body)
            .unwrap()
            .upnp_error
            .unwrap();
        assert_eq!(error.code, 714);
        assert_eq!(error.description, "No such object");
    }
}
