//! Parsing des descriptions de service (SCPD).

use std::io::BufReader;
use std::sync::Arc;

use tracing::warn;
use xmltree::Element;

use crate::errors::XmlError;
use crate::object_set::{Named, ObjectSet};
use crate::value_ranges::ValueRange;
use crate::values::{Value, VarType};
use crate::xml;

/// Sens d'un argument d'action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    /// Parse le contenu de `<direction>`, sans tenir compte de la casse.
    fn from_wire(raw: &str) -> Option<Direction> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }
}

/// Argument déclaré d'une action SCPD.
#[derive(Debug, Clone)]
pub struct ScpdArgument {
    pub name: String,
    pub direction: Direction,
    /// Marqué si l'élément `<retval/>` est présent
    pub retval: bool,
    pub related_state_variable: String,
}

/// Action déclarée dans un SCPD. L'ordre des arguments est celui du document.
#[derive(Debug, Clone)]
pub struct ScpdAction {
    pub name: String,
    pub arguments: Vec<ScpdArgument>,
}

impl Named for ScpdAction {
    fn name(&self) -> &str {
        &self.name
    }
}

impl ScpdAction {
    pub fn in_arguments(&self) -> impl Iterator<Item = &ScpdArgument> {
        self.arguments
            .iter()
            .filter(|a| a.direction == Direction::In)
    }

    pub fn out_arguments(&self) -> impl Iterator<Item = &ScpdArgument> {
        self.arguments
            .iter()
            .filter(|a| a.direction == Direction::Out)
    }
}

/// Variable d'état déclarée dans un SCPD.
#[derive(Debug, Clone)]
pub struct ScpdStateVariable {
    pub name: String,
    pub send_events: bool,
    pub multicast: bool,
    pub data_type: VarType,
    pub default_value: Option<Value>,
    pub allowed_values: Option<Vec<String>>,
    pub range: Option<ValueRange>,
}

impl Named for ScpdStateVariable {
    fn name(&self) -> &str {
        &self.name
    }
}

impl ScpdStateVariable {
    pub fn is_numeric(&self) -> bool {
        self.data_type.is_numeric()
    }
}

/// Description de service parsée.
#[derive(Debug, Clone)]
pub struct Scpd {
    pub spec_version: (i64, i64),
    pub actions: ObjectSet<ScpdAction>,
    pub state_variables: ObjectSet<ScpdStateVariable>,
}

impl Scpd {
    pub fn action(&self, name: &str) -> Option<Arc<ScpdAction>> {
        self.actions.get(name)
    }

    pub fn state_variable(&self, name: &str) -> Option<Arc<ScpdStateVariable>> {
        self.state_variables.get(name)
    }
}

/// Parse un document SCPD.
pub fn parse_scpd(bytes: &[u8]) -> Result<Scpd, XmlError> {
    let reader = BufReader::new(bytes);
    let root = Element::parse(reader).map_err(XmlError::from)?;

    if root.name != "scpd" {
        return Err(XmlError::NoNode("scpd".to_string()));
    }

    let spec_version = xml::find_child(&root, "specVersion")
        .map(|spec| {
            (
                xml::child_int(spec, "major").unwrap_or(1),
                xml::child_int(spec, "minor").unwrap_or(0),
            )
        })
        .unwrap_or((1, 0));

    let mut state_variables = ObjectSet::new();
    if let Some(table) = xml::find_child(&root, "serviceStateTable") {
        for elem in xml::children(table).filter(|e| e.name == "stateVariable") {
            if let Some(variable) = parse_state_variable(elem) {
                if let Err(e) = state_variables.insert(Arc::new(variable)) {
                    warn!("Duplicate state variable in SCPD: {}", e);
                }
            }
        }
    }

    let mut actions = ObjectSet::new();
    if let Some(list) = xml::find_child(&root, "actionList") {
        for elem in xml::children(list).filter(|e| e.name == "action") {
            if let Some(action) = parse_action(elem, &state_variables) {
                if let Err(e) = actions.insert(Arc::new(action)) {
                    warn!("Duplicate action in SCPD: {}", e);
                }
            }
        }
    }

    Ok(Scpd {
        spec_version,
        actions,
        state_variables,
    })
}

fn parse_action(
    elem: &Element,
    state_variables: &ObjectSet<ScpdStateVariable>,
) -> Option<ScpdAction> {
    let name = xml::child_text(elem, "name")?;

    let mut arguments = Vec::new();
    if let Some(list) = xml::find_child(elem, "argumentList") {
        for arg_elem in xml::children(list).filter(|e| e.name == "argument") {
            let Some(arg_name) = xml::child_text(arg_elem, "name") else {
                continue;
            };
            let Some(direction) = xml::child_text(arg_elem, "direction")
                .and_then(|raw| Direction::from_wire(&raw))
            else {
                warn!(
                    action = name.as_str(),
                    argument = arg_name.as_str(),
                    "Argument without valid direction, skipping"
                );
                continue;
            };

            let related = xml::child_text(arg_elem, "relatedStateVariable").unwrap_or_default();
            // Référence non résolue : avertissement, pas d'erreur fatale
            if !related.is_empty() && !state_variables.contains(&related) {
                warn!(
                    action = name.as_str(),
                    argument = arg_name.as_str(),
                    variable = related.as_str(),
                    "relatedStateVariable does not resolve"
                );
            }

            arguments.push(ScpdArgument {
                name: arg_name,
                direction,
                retval: xml::find_child(arg_elem, "retval").is_some(),
                related_state_variable: related,
            });
        }
    }

    Some(ScpdAction { name, arguments })
}

fn parse_state_variable(elem: &Element) -> Option<ScpdStateVariable> {
    let name = xml::child_text(elem, "name")?;

    let data_type = xml::child_text(elem, "dataType")
        .map(|raw| VarType::from_wire_name(raw.trim()))
        .unwrap_or(VarType::String);

    let send_events = elem
        .attributes
        .get("sendEvents")
        .map(|v| v != "no")
        .unwrap_or(true);
    let multicast = elem
        .attributes
        .get("multicast")
        .map(|v| v == "yes")
        .unwrap_or(false);

    let default_value = xml::child_text(elem, "defaultValue").and_then(|raw| {
        match Value::from_wire(&raw, data_type) {
            Ok(value) => Some(value),
            Err(e) => {
                warn!(variable = name.as_str(), "Invalid defaultValue: {}", e);
                None
            }
        }
    });

    let allowed_values = xml::find_child(elem, "allowedValueList").map(|list| {
        xml::children(list)
            .filter(|e| e.name == "allowedValue")
            .map(xml::text_of)
            .collect()
    });

    let range = xml::find_child(elem, "allowedValueRange").and_then(|range_elem| {
        let min = Value::from_wire(&xml::child_text(range_elem, "minimum")?, data_type).ok()?;
        let max = Value::from_wire(&xml::child_text(range_elem, "maximum")?, data_type).ok()?;
        let step = xml::child_text(range_elem, "step")
            .and_then(|raw| Value::from_wire(&raw, data_type).ok());
        Some(ValueRange { min, max, step })
    });

    Some(ScpdStateVariable {
        name,
        send_events,
        multicast,
        data_type,
        default_value,
        allowed_values,
        range,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const SCPD: &str = r#"<?xml version="1.0"?>
<scpd xmlns="urn:schemas-upnp-org:service-1-0">
  <specVersion><major>1</major><minor>0</minor></specVersion>
  <actionList>
    <action>
      <name>GetVolume</name>
      <argumentList>
        <argument>
          <name>Channel</name>
          <direction>In</direction>
          <relatedStateVariable>A_ARG_TYPE_Channel</relatedStateVariable>
        </argument>
        <argument>
          <name>CurrentVolume</name>
          <direction>OUT</direction>
          <retval/>
          <relatedStateVariable>Volume</relatedStateVariable>
        </argument>
      </argumentList>
    </action>
  </actionList>
  <serviceStateTable>
    <stateVariable sendEvents="yes">
      <name>Volume</name>
      <dataType>ui2</dataType>
      <defaultValue>50</defaultValue>
      <allowedValueRange>
        <minimum>0</minimum>
        <maximum>100</maximum>
        <step>1</step>
      </allowedValueRange>
    </stateVariable>
    <stateVariable sendEvents="no">
      <name>A_ARG_TYPE_Channel</name>
      <dataType>string</dataType>
      <allowedValueList>
        <allowedValue>Master</allowedValue>
        <allowedValue>LF</allowedValue>
      </allowedValueList>
    </stateVariable>
  </serviceStateTable>
</scpd>"#;

    #[test]
    fn test_parse_actions_and_variables() {
        let scpd = parse_scpd(SCPD.as_bytes()).unwrap();

        let action = scpd.action("GetVolume").unwrap();
        assert_eq!(action.arguments.len(), 2);

        // direction insensible à la casse, retval sur présence de l'élément
        assert_eq!(action.arguments[0].direction, Direction::In);
        assert!(!action.arguments[0].retval);
        assert_eq!(action.arguments[1].direction, Direction::Out);
        assert!(action.arguments[1].retval);

        let volume = scpd.state_variable("Volume").unwrap();
        assert!(volume.send_events);
        assert_eq!(volume.data_type, VarType::UI2);
        assert_eq!(volume.default_value, Some(Value::UI2(50)));
        assert!(volume.is_numeric());
        let range = volume.range.as_ref().unwrap();
        assert_eq!(range.min, Value::UI2(0));
        assert_eq!(range.max, Value::UI2(100));

        let channel = scpd.state_variable("A_ARG_TYPE_Channel").unwrap();
        assert!(!channel.send_events);
        assert_eq!(
            channel.allowed_values.as_ref().unwrap(),
            &vec!["Master".to_string(), "LF".to_string()]
        );
    }

    #[test]
    fn test_unresolved_related_variable_is_not_fatal() {
        let xml = SCPD.replace("A_ARG_TYPE_Channel</relatedStateVariable>", "Ghost</relatedStateVariable>");
        let scpd = parse_scpd(xml.as_bytes()).unwrap();
        // L'action reste présente malgré la référence cassée
        assert!(scpd.action("GetVolume").is_some());
    }

    #[test]
    fn test_unknown_data_type_is_string() {
        let xml = SCPD.replace("<dataType>ui2</dataType>", "<dataType>mystery</dataType>");
        let scpd = parse_scpd(xml.as_bytes()).unwrap();
        assert_eq!(
            scpd.state_variable("Volume").unwrap().data_type,
            VarType::String
        );
    }

    #[test]
    fn test_argument_order_preserved() {
        let scpd = parse_scpd(SCPD.as_bytes()).unwrap();
        let action = scpd.action("GetVolume").unwrap();
        let names: Vec<_> = action.arguments.iter().map(|a| a.name.as_str()).collect();
        assert_eq!(names, vec!["Channel", "CurrentVolume"]);
    }
}
