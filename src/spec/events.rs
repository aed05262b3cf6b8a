//! The shared publish/subscribe directory (`shared/spec/events.yaml`).

use serde_yaml::Value;

use super::doc::{join, DocDiagnostics};
use crate::validator::IssueKind;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventSpec {
    pub name: String,
    /// Model carried as the event payload.
    pub message: String,
    pub publish: bool,
    pub subscribe: bool,
}

impl EventSpec {
    /// Bus subject for this event: underscores become dots.
    pub fn subject(&self) -> String {
        self.name.replace('_', ".")
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventsSpec {
    pub events: Vec<EventSpec>,
}

impl EventsSpec {
    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn publishers(&self) -> impl Iterator<Item = &EventSpec> {
        self.events.iter().filter(|e| e.publish)
    }

    pub fn subscribers(&self) -> impl Iterator<Item = &EventSpec> {
        self.events.iter().filter(|e| e.subscribe)
    }
}

pub(crate) fn parse_events(root: &Value, diag: &mut DocDiagnostics<'_>) -> EventsSpec {
    let Some(root) = diag.mapping(root, "") else {
        return EventsSpec::default();
    };
    diag.check_keys(root, &["events"], "");
    let Some(raw_events) = root
        .get("events")
        .filter(|v| !v.is_null())
        .and_then(|v| diag.mapping(v, "events"))
    else {
        return EventsSpec::default();
    };

    let mut events = Vec::new();
    for (name, raw) in diag.entries(raw_events, "events") {
        let path = join("events", name);
        let Some(map) = diag.mapping(raw, &path) else {
            continue;
        };
        diag.check_keys(map, &["message", "publish", "subscribe"], &path);
        let before = diag.issue_count();
        let message = diag.optional_str(map, "message", &path);
        let publish = diag.flag(map, "publish", &path);
        let subscribe = diag.flag(map, "subscribe", &path);
        let Some(message) = message.filter(|m| !m.is_empty()) else {
            diag.report(&path, IssueKind::ParseError, format!("Event '{name}' must name a 'message' model"));
            continue;
        };
        if !publish && !subscribe {
            diag.report(
                &path,
                IssueKind::ParseError,
                format!("Event '{name}' must have publish=true or subscribe=true (or both)"),
            );
            continue;
        }
        if diag.issue_count() != before {
            continue;
        }
        events.push(EventSpec {
            name: name.to_string(),
            message,
            publish,
            subscribe,
        });
    }
    EventsSpec { events }
}
