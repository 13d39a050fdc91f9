//! Declarative form of the event table.
//!
//! ```json
//! { "events": [
//!     { "type": "match", "name": "chassis-on",
//!       "signatures": [{ "type": "signal", "interface": "org.freedesktop.DBus.Properties",
//!                        "member": "PropertiesChanged", "path": "/xyz/openbmc_project/state/chassis0" }],
//!       "filters": [{ "name": "property_changed_to", "interface": "xyz.openbmc_project.State.Chassis",
//!                     "property": "CurrentPowerState",
//!                     "value": { "type": "string", "value": "On" } }],
//!       "actions": [{ "name": "create_objects", "objs": { "/system/chassis": {} } }] }
//! ] }
//! ```

use super::{
    CreateObjects, DestroyObjects, Event, EventError, EventErrorExt, NoopAction, NoopFilter,
    PathCondition, PropertyChangedTo, PropertyIs, SetProperty,
};
use pim_bus::MatchRule;
use pim_domain::object::ObjectMap;
use pim_domain::value::Value;
use serde::Deserialize;
use std::collections::BTreeMap;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct EventFile {
    pub events: Vec<EventSpec>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventSpec {
    Startup {
        #[serde(default)]
        name: String,
        #[serde(default)]
        filters: Vec<FilterSpec>,
        #[serde(default)]
        actions: Vec<ActionSpec>,
    },
    /// One event per signature; they share filters and actions.
    Match {
        #[serde(default)]
        name: String,
        signatures: Vec<BTreeMap<String, String>>,
        #[serde(default)]
        filters: Vec<FilterSpec>,
        #[serde(default)]
        actions: Vec<ActionSpec>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum FilterSpec {
    None,
    PropertyChangedTo { interface: String, property: String, value: Value },
    PropertyIs {
        path: String,
        interface: String,
        property: String,
        value: Value,
        #[serde(default)]
        service: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ConditionSpec {
    PropertyIs {
        interface: String,
        property: String,
        value: Value,
        #[serde(default)]
        service: Option<String>,
    },
}

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "name", rename_all = "snake_case")]
pub enum ActionSpec {
    Noop,
    CreateObjects {
        objs: ObjectMap,
    },
    DestroyObjects {
        paths: Vec<String>,
        #[serde(default)]
        conditions: Vec<ConditionSpec>,
    },
    SetProperty {
        paths: Vec<String>,
        #[serde(default)]
        conditions: Vec<ConditionSpec>,
        interface: String,
        property: String,
        value: Value,
    },
}

impl EventFile {
    /// Turns the declarations into engine events, in file order.
    ///
    /// # Errors
    ///
    /// [`EventError::MalformedDeclaration`] for a match event without signatures,
    /// [`EventError::InvalidMatch`] for a signature the bus would reject.
    pub fn compile(self) -> Result<Vec<Event>, EventError> {
        let mut events = Vec::new();
        for (index, spec) in self.events.into_iter().enumerate() {
            match spec {
                EventSpec::Startup { name, filters, actions } => {
                    let name = or_index(name, index);
                    events.push(populate(Event::startup(name), &filters, &actions));
                },
                EventSpec::Match { name, signatures, filters, actions } => {
                    let name = or_index(name, index);
                    if signatures.is_empty() {
                        return Err(EventError::MalformedDeclaration {
                            message: "match event without signatures".into(),
                            context: Some(name.into()),
                        });
                    }
                    for signature in &signatures {
                        let rule = render(signature)?;
                        let event = Event::on_signal(name.clone(), rule);
                        events.push(populate(event, &filters, &actions));
                    }
                },
            }
        }
        Ok(events)
    }
}

fn or_index(name: String, index: usize) -> String {
    if name.is_empty() { format!("event#{index}") } else { name }
}

/// Renders `key='value',...` and makes sure the bus accepts it.
fn render(signature: &BTreeMap<String, String>) -> Result<String, EventError> {
    let rule = signature
        .iter()
        .map(|(key, value)| format!("{key}='{value}'"))
        .collect::<Vec<_>>()
        .join(",");
    rule.parse::<MatchRule>().context(rule.clone())?;
    Ok(rule)
}

fn populate(mut event: Event, filters: &[FilterSpec], actions: &[ActionSpec]) -> Event {
    for filter in filters.iter().cloned() {
        event = match filter {
            FilterSpec::None => event.filter(NoopFilter),
            FilterSpec::PropertyChangedTo { interface, property, value } => {
                event.filter(PropertyChangedTo { interface, property, value })
            },
            FilterSpec::PropertyIs { path, interface, property, value, service } => {
                event.filter(PropertyIs { path: Some(path), interface, property, value, service })
            }
        };
    }
    for action in actions.iter().cloned() {
        event = match action {
            ActionSpec::Noop => event.action(NoopAction),
            ActionSpec::CreateObjects { objs } => event.action(CreateObjects { objects: objs }),
            ActionSpec::DestroyObjects { paths, conditions } => event.action(DestroyObjects {
                paths,
                conditions: conditions.into_iter().map(ConditionSpec::build).collect(),
            }),
            ActionSpec::SetProperty { paths, conditions, interface, property, value } => {
                event.action(SetProperty {
                    paths,
                    conditions: conditions.into_iter().map(ConditionSpec::build).collect(),
                    interface,
                    property,
                    value,
                })
            }
        };
    }
    event
}

impl ConditionSpec {
    fn build(self) -> Box<dyn PathCondition> {
        match self {
            Self::PropertyIs { interface, property, value, service } => {
                Box::new(PropertyIs { path: None, interface, property, value, service })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::Trigger;

    const FILE: &str = r#"{
        "events": [
            { "type": "startup", "name": "seed",
              "actions": [{ "name": "create_objects", "objs": { "/a": { "I": {} } } }] },
            { "type": "match", "name": "watch",
              "signatures": [
                  { "type": "signal", "member": "PropertiesChanged", "path": "/x" },
                  { "type": "signal", "member": "InterfacesAdded" }
              ],
              "filters": [{ "name": "property_changed_to", "interface": "I", "property": "P",
                            "value": { "type": "int32", "value": 1 } }],
              "actions": [{ "name": "destroy_objects", "paths": ["/a"],
                            "conditions": [{ "name": "property_is", "interface": "I",
                                             "property": "P", "value": { "type": "boolean", "value": true } }] }] }
        ]
    }"#;

    #[test]
    fn match_events_fan_out_per_signature() {
        let file: EventFile = serde_json::from_str(FILE).unwrap();
        let events = file.compile().unwrap();
        assert_eq!(events.len(), 3);
        assert_eq!(events[0].trigger(), &Trigger::Startup);
        assert_eq!(events[0].actions().len(), 1);
        assert_eq!(
            events[1].trigger(),
            &Trigger::Signal("member='PropertiesChanged',path='/x',type='signal'".to_owned())
        );
        assert_eq!(events[2].name(), "watch");
        assert_eq!(events[2].filters().len(), 1);
    }

    #[test]
    fn match_without_signatures_is_malformed() {
        let file: EventFile =
            serde_json::from_str(r#"{"events":[{"type":"match","signatures":[]}]}"#).unwrap();
        assert!(matches!(file.compile(), Err(EventError::MalformedDeclaration { .. })));
    }

    #[test]
    fn unknown_signature_key_is_rejected() {
        let file: EventFile = serde_json::from_str(
            r#"{"events":[{"type":"match","signatures":[{"colour":"blue"}]}]}"#,
        )
        .unwrap();
        assert!(matches!(file.compile(), Err(EventError::InvalidMatch { .. })));
    }

    #[test]
    fn unknown_event_type_fails_to_parse() {
        assert!(serde_json::from_str::<EventFile>(r#"{"events":[{"type":"cron"}]}"#).is_err());
    }
}
