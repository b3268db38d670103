//! Pending SOAP actions.
//!
//! A [`ProxyAction`] renders its envelope once at construction; the opening
//! action element (which needs the target service type) is only inserted at
//! send time, so the same action can be re-sent without re-rendering its
//! arguments. Actions are shared (`Arc`): the completion may land after the
//! caller has dropped its own handle.

use std::sync::{Arc, Condvar, Mutex};
use std::time::Duration;

use tracing::warn;
use xmltree::Element;

use ravupnp::errors::UpnpError;
use ravupnp::soap;
use ravupnp::values::{Value, VarType};
use ravupnp::xml;

use crate::cancel::CancelToken;

pub(crate) enum ActionState {
    Pending,
    Done(Result<Element, UpnpError>),
}

/// An action being (or about to be) invoked on a remote service.
pub struct ProxyAction {
    name: String,
    /// Rendered envelope, action element opening excluded
    body: String,
    /// Insertion point of the action opening tag
    header_pos: usize,
    state: Mutex<ActionState>,
    done: Condvar,
    cancel: CancelToken,
}

impl ProxyAction {
    /// Builds a pending action with its IN arguments, in call order.
    pub fn new(name: impl Into<String>, in_args: &[(&str, Value)]) -> Arc<Self> {
        let name = name.into();
        let mut body = String::new();
        let header_pos = soap::begin_envelope(&mut body);
        for (arg_name, value) in in_args {
            soap::append_argument(&mut body, arg_name, &value.to_wire());
        }
        soap::end_envelope(&mut body, &name);

        Arc::new(Self {
            name,
            body,
            header_pos,
            state: Mutex::new(ActionState::Pending),
            done: Condvar::new(),
            cancel: CancelToken::new(),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Cancels the action. The outstanding HTTP transfer, if any, is
    /// abandoned; result retrieval reports `Cancelled` from now on.
    pub fn cancel(&self) {
        self.cancel.cancel();
        self.done.notify_all();
    }

    /// Complete HTTP body for a given target service type.
    pub(crate) fn body_for(&self, service_type: &str) -> String {
        let mut body = self.body.clone();
        body.insert_str(
            self.header_pos,
            &soap::action_open_tag(&self.name, service_type),
        );
        body
    }

    /// Stores the outcome of the HTTP exchange. First completion wins.
    pub(crate) fn complete(&self, result: Result<Element, UpnpError>) {
        let mut state = self.state.lock().unwrap();
        if matches!(*state, ActionState::Pending) {
            *state = ActionState::Done(result);
        }
        self.done.notify_all();
    }

    pub(crate) fn wait_done(&self) -> Result<(), UpnpError> {
        let mut state = self.state.lock().unwrap();
        loop {
            if self.cancel.is_cancelled() {
                return Err(UpnpError::Cancelled);
            }
            match &*state {
                ActionState::Done(Ok(_)) => return Ok(()),
                ActionState::Done(Err(e)) => return Err(e.clone()),
                ActionState::Pending => {
                    let (next, _) = self
                        .done
                        .wait_timeout(state, Duration::from_millis(50))
                        .unwrap();
                    state = next;
                }
            }
        }
    }

    /// Reads the requested OUT arguments from the parsed response.
    ///
    /// Each argument is looked up as a direct child of the response element
    /// and coerced to the requested type; a missing or inconvertible
    /// argument yields the type's zero value with a warning.
    pub fn get_result(&self, out_args: &[(&str, VarType)]) -> Result<Vec<(String, Value)>, UpnpError> {
        if self.cancel.is_cancelled() {
            return Err(UpnpError::Cancelled);
        }

        let state = self.state.lock().unwrap();
        let element = match &*state {
            ActionState::Pending => {
                return Err(UpnpError::Transport(
                    "action has not completed yet".to_string(),
                ));
            }
            ActionState::Done(Err(e)) => return Err(e.clone()),
            ActionState::Done(Ok(element)) => element,
        };

        let mut values = Vec::with_capacity(out_args.len());
        for (name, var_type) in out_args {
            let value = match xml::find_child(element, name) {
                Some(child) => {
                    let raw = xml::text_of(child);
                    Value::from_wire(&raw, *var_type).unwrap_or_else(|e| {
                        warn!(
                            action = self.name.as_str(),
                            argument = *name,
                            "Could not coerce response argument: {}",
                            e
                        );
                        Value::zero(*var_type)
                    })
                }
                None => {
                    warn!(
                        action = self.name.as_str(),
                        argument = *name,
                        "Could not find argument in response"
                    );
                    Value::zero(*var_type)
                }
            };
            values.push((name.to_string(), value));
        }
        Ok(values)
    }
}

impl std::fmt::Debug for ProxyAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProxyAction")
            .field("name", &self.name)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish()
    }
}

/// Handle on an in-flight call.
pub struct PendingCall {
    action: Arc<ProxyAction>,
}

impl PendingCall {
    pub(crate) fn new(action: Arc<ProxyAction>) -> Self {
        Self { action }
    }

    pub fn action(&self) -> &Arc<ProxyAction> {
        &self.action
    }

    /// Blocks until the call completes, errors or is cancelled.
    pub fn wait(&self) -> Result<(), UpnpError> {
        self.action.wait_done()
    }
}
