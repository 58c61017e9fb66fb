//! Notification payloads published by the core.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hearth_types::{Event, RuleId, SetupStatus, StateTypeId, ThingId, Value};

/// A change the core announces to subscribers.
///
/// The registry and the rule engine publish these; the RPC boundary forwards
/// them to connected clients. For any single publisher, subscribers observe
/// notifications in publish order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "notification", rename_all = "camelCase")]
pub enum Notification {
    /// A thing entered the registry.
    ThingAdded {
        /// The new thing.
        thing_id: ThingId,
    },
    /// A thing's name, params, or settings changed.
    ThingChanged {
        /// The changed thing.
        thing_id: ThingId,
    },
    /// A thing left the registry.
    ThingRemoved {
        /// The removed thing.
        thing_id: ThingId,
    },
    /// A thing's setup lifecycle advanced.
    ThingSetupStatusChanged {
        /// The thing being set up.
        thing_id: ThingId,
        /// The new status.
        status: SetupStatus,
    },
    /// A state value changed.
    ThingStateChanged {
        /// The owning thing.
        thing_id: ThingId,
        /// The changed state.
        state_type_id: StateTypeId,
        /// Value before the write.
        old_value: Value,
        /// Value after the write.
        new_value: Value,
        /// When the change was committed.
        timestamp: DateTime<Utc>,
    },
    /// A thing emitted an event.
    EventTriggered {
        /// The emitted event.
        event: Event,
    },
    /// A rule entered the engine.
    RuleAdded {
        /// The new rule.
        rule_id: RuleId,
    },
    /// A rule left the engine.
    RuleRemoved {
        /// The removed rule.
        rule_id: RuleId,
    },
    /// A rule's definition or enablement changed.
    RuleConfigChanged {
        /// The changed rule.
        rule_id: RuleId,
    },
    /// A rule's activity flipped.
    RuleActiveChanged {
        /// The rule in question.
        rule_id: RuleId,
        /// Whether the rule is now active.
        active: bool,
    },
}

impl Notification {
    /// A short stable name for logs and wire subscriptions.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ThingAdded { .. } => "thing_added",
            Self::ThingChanged { .. } => "thing_changed",
            Self::ThingRemoved { .. } => "thing_removed",
            Self::ThingSetupStatusChanged { .. } => "thing_setup_status_changed",
            Self::ThingStateChanged { .. } => "thing_state_changed",
            Self::EventTriggered { .. } => "event_triggered",
            Self::RuleAdded { .. } => "rule_added",
            Self::RuleRemoved { .. } => "rule_removed",
            Self::RuleConfigChanged { .. } => "rule_config_changed",
            Self::RuleActiveChanged { .. } => "rule_active_changed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_names() {
        let n = Notification::ThingAdded {
            thing_id: ThingId::new(),
        };
        assert_eq!(n.kind(), "thing_added");
        let n = Notification::RuleActiveChanged {
            rule_id: RuleId::new(),
            active: true,
        };
        assert_eq!(n.kind(), "rule_active_changed");
    }

    #[test]
    fn test_serde_round_trip() {
        let n = Notification::ThingStateChanged {
            thing_id: ThingId::new(),
            state_type_id: StateTypeId::new(),
            old_value: Value::Bool(false),
            new_value: Value::Bool(true),
            timestamp: Utc::now(),
        };
        let json = serde_json::to_string(&n).unwrap();
        let back: Notification = serde_json::from_str(&json).unwrap();
        assert_eq!(n, back);
    }
}
