//! Actions des services UPnP.
//!
//! Une [`Action`] décrit une opération invocable : ses arguments, dans
//! l'ordre du SCPD, chacun lié à une variable d'état. Le handler applicatif
//! reçoit une [`ActionInvocation`] et la restitue après avoir posé ses
//! arguments de sortie ou son erreur.

mod invocation;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use xmltree::{Element, XMLNode};

use crate::description::Direction;
use crate::object_set::{Named, ObjectSet};
use crate::state_variables::StateVariable;

pub use invocation::{ActionInvocation, InvocationStatus};

/// Future retournée par un handler d'action.
pub type ActionFuture = Pin<Box<dyn Future<Output = ActionInvocation> + Send>>;

/// Handler applicatif d'une action.
///
/// Reçoit l'invocation, pose ses sorties via [`ActionInvocation::set`] puis la
/// restitue ; une invocation restituée sans statut explicite vaut succès.
pub type ActionHandler = Arc<dyn Fn(ActionInvocation) -> ActionFuture + Send + Sync>;

fn text_element(name: &str, content: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(content.to_string()));
    elem
}

/// Argument déclaré d'une action, lié à sa variable d'état.
#[derive(Debug, Clone)]
pub struct Argument {
    name: String,
    direction: Direction,
    retval: bool,
    state_variable: Arc<StateVariable>,
}

impl Named for Argument {
    fn name(&self) -> &str {
        &self.name
    }
}

impl Argument {
    pub fn new_in(name: impl Into<String>, state_variable: Arc<StateVariable>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::In,
            retval: false,
            state_variable,
        }
    }

    pub fn new_out(name: impl Into<String>, state_variable: Arc<StateVariable>) -> Self {
        Self {
            name: name.into(),
            direction: Direction::Out,
            retval: false,
            state_variable,
        }
    }

    pub fn as_retval(mut self) -> Self {
        self.retval = true;
        self
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn is_in(&self) -> bool {
        self.direction == Direction::In
    }

    pub fn is_out(&self) -> bool {
        self.direction == Direction::Out
    }

    pub fn is_retval(&self) -> bool {
        self.retval
    }

    pub fn state_variable(&self) -> &Arc<StateVariable> {
        &self.state_variable
    }

    /// Élément `<argument>` pour le SCPD.
    pub fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("argument");
        elem.children
            .push(XMLNode::Element(text_element("name", &self.name)));
        elem.children.push(XMLNode::Element(text_element(
            "direction",
            match self.direction {
                Direction::In => "in",
                Direction::Out => "out",
            },
        )));
        if self.retval {
            elem.children.push(XMLNode::Element(Element::new("retval")));
        }
        elem.children.push(XMLNode::Element(text_element(
            "relatedStateVariable",
            self.state_variable.name(),
        )));
        elem
    }
}

/// Action UPnP : un nom et une liste ordonnée d'arguments.
#[derive(Debug, Clone)]
pub struct Action {
    name: String,
    arguments: Vec<Arc<Argument>>,
}

impl Named for Action {
    fn name(&self) -> &str {
        &self.name
    }
}

pub type ActionSet = ObjectSet<Action>;

impl Action {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            arguments: Vec::new(),
        }
    }

    pub fn add_argument(mut self, argument: Argument) -> Self {
        self.arguments.push(Arc::new(argument));
        self
    }

    pub fn arguments(&self) -> &[Arc<Argument>] {
        &self.arguments
    }

    pub fn in_arguments(&self) -> impl Iterator<Item = &Arc<Argument>> {
        self.arguments.iter().filter(|a| a.is_in())
    }

    pub fn out_arguments(&self) -> impl Iterator<Item = &Arc<Argument>> {
        self.arguments.iter().filter(|a| a.is_out())
    }

    /// Élément `<action>` pour le SCPD.
    pub fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("action");
        elem.children
            .push(XMLNode::Element(text_element("name", &self.name)));

        if !self.arguments.is_empty() {
            let mut list = Element::new("argumentList");
            for argument in &self.arguments {
                list.children.push(XMLNode::Element(argument.to_xml_element()));
            }
            elem.children.push(XMLNode::Element(list));
        }

        elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::values::VarType;
    use crate::xml;

    #[test]
    fn test_action_xml_preserves_argument_order() {
        let object_id = Arc::new(
            StateVariable::new("A_ARG_TYPE_ObjectID", VarType::String).with_send_events(false),
        );
        let count = Arc::new(
            StateVariable::new("A_ARG_TYPE_Count", VarType::UI4).with_send_events(false),
        );

        let action = Action::new("Browse")
            .add_argument(Argument::new_in("ObjectID", object_id))
            .add_argument(Argument::new_out("NumberReturned", count.clone()))
            .add_argument(Argument::new_out("TotalMatches", count));

        let elem = action.to_xml_element();
        let list = xml::find_child(&elem, "argumentList").unwrap();
        let names: Vec<_> = xml::children(list)
            .filter_map(|arg| xml::child_text(arg, "name"))
            .collect();
        assert_eq!(names, vec!["ObjectID", "NumberReturned", "TotalMatches"]);
    }

    #[test]
    fn test_retval_element_present() {
        let var = Arc::new(StateVariable::new("Result", VarType::String).with_send_events(false));
        let action = Action::new("Get")
            .add_argument(Argument::new_out("Result", var).as_retval());

        let elem = action.to_xml_element();
        let list = xml::find_child(&elem, "argumentList").unwrap();
        let argument = xml::children(list).next().unwrap();
        assert!(xml::find_child(argument, "retval").is_some());
        assert_eq!(
            xml::child_text(argument, "relatedStateVariable").unwrap(),
            "Result"
        );
    }
}
