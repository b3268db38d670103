//! Méthodes du modèle de variable d'état.

use xmltree::{Element, XMLNode};

use crate::state_variables::StateVariable;
use crate::value_ranges::ValueRange;
use crate::values::{Value, VarType};

fn text_element(name: &str, content: &str) -> Element {
    let mut elem = Element::new(name);
    elem.children.push(XMLNode::Text(content.to_string()));
    elem
}

impl StateVariable {
    /// Crée une variable d'état événementée (sendEvents="yes").
    pub fn new(name: impl Into<String>, var_type: VarType) -> Self {
        Self {
            name: name.into(),
            var_type,
            send_events: true,
            multicast: false,
            default_value: None,
            allowed_values: Vec::new(),
            range: None,
        }
    }

    pub fn with_send_events(mut self, send_events: bool) -> Self {
        self.send_events = send_events;
        self
    }

    pub fn with_multicast(mut self, multicast: bool) -> Self {
        self.multicast = multicast;
        self
    }

    pub fn with_default(mut self, value: Value) -> Self {
        self.default_value = Some(value);
        self
    }

    pub fn with_allowed_values(
        mut self,
        values: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        self.allowed_values = values.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_range(mut self, range: ValueRange) -> Self {
        self.range = Some(range);
        self
    }

    pub fn var_type(&self) -> VarType {
        self.var_type
    }

    pub fn sends_events(&self) -> bool {
        self.send_events
    }

    pub fn multicasts_events(&self) -> bool {
        self.multicast
    }

    pub fn default_value(&self) -> Option<&Value> {
        self.default_value.as_ref()
    }

    pub fn allowed_values(&self) -> &[String] {
        &self.allowed_values
    }

    pub fn range(&self) -> Option<&ValueRange> {
        self.range.as_ref()
    }

    /// Valeur initiale d'une instance : défaut déclaré ou zéro du type.
    pub fn initial_value(&self) -> Value {
        self.default_value
            .clone()
            .unwrap_or_else(|| Value::zero(self.var_type))
    }

    /// Élément `<stateVariable>` pour le SCPD.
    pub fn to_xml_element(&self) -> Element {
        let mut elem = Element::new("stateVariable");
        elem.attributes.insert(
            "sendEvents".to_string(),
            if self.send_events { "yes" } else { "no" }.to_string(),
        );
        if self.multicast {
            elem.attributes
                .insert("multicast".to_string(), "yes".to_string());
        }

        elem.children
            .push(XMLNode::Element(text_element("name", &self.name)));
        elem.children.push(XMLNode::Element(text_element(
            "dataType",
            self.var_type.wire_name(),
        )));

        if let Some(default) = &self.default_value {
            elem.children.push(XMLNode::Element(text_element(
                "defaultValue",
                &default.to_wire(),
            )));
        }

        if !self.allowed_values.is_empty() {
            let mut list = Element::new("allowedValueList");
            for value in &self.allowed_values {
                list.children
                    .push(XMLNode::Element(text_element("allowedValue", value)));
            }
            elem.children.push(XMLNode::Element(list));
        } else if let Some(range) = &self.range {
            let mut range_elem = Element::new("allowedValueRange");
            range_elem
                .children
                .push(XMLNode::Element(text_element("minimum", &range.min.to_wire())));
            range_elem
                .children
                .push(XMLNode::Element(text_element("maximum", &range.max.to_wire())));
            if let Some(step) = &range.step {
                range_elem
                    .children
                    .push(XMLNode::Element(text_element("step", &step.to_wire())));
            }
            elem.children.push(XMLNode::Element(range_elem));
        }

        elem
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_value() {
        let volume = StateVariable::new("Volume", VarType::UI2).with_default(Value::UI2(50));
        assert_eq!(volume.initial_value(), Value::UI2(50));

        let mute = StateVariable::new("Mute", VarType::Boolean);
        assert_eq!(mute.initial_value(), Value::Boolean(false));
    }

    #[test]
    fn test_xml_element() {
        let variable = StateVariable::new("Volume", VarType::UI2)
            .with_default(Value::UI2(50))
            .with_range(ValueRange::with_step(
                Value::UI2(0),
                Value::UI2(100),
                Value::UI2(1),
            ));

        let elem = variable.to_xml_element();
        assert_eq!(elem.attributes.get("sendEvents").unwrap(), "yes");
        assert_eq!(
            crate::xml::child_text(&elem, "dataType").unwrap(),
            "ui2"
        );
        assert_eq!(
            crate::xml::child_text(&elem, "defaultValue").unwrap(),
            "50"
        );
        let range = crate::xml::find_child(&elem, "allowedValueRange").unwrap();
        assert_eq!(crate::xml::child_int(range, "maximum").unwrap(), 100);
    }

    #[test]
    fn test_non_evented_variable() {
        let variable =
            StateVariable::new("A_ARG_TYPE_InstanceID", VarType::UI4).with_send_events(false);
        let elem = variable.to_xml_element();
        assert_eq!(elem.attributes.get("sendEvents").unwrap(), "no");
    }
}
