//! Commands external surfaces send into the dispatcher.

use chrono::NaiveDateTime;
use tokio::sync::oneshot;

use hearth_plugins::{ReplyStatus, ThingDescriptor};
use hearth_rules::{RemovePolicy, Rule};
use hearth_things::AddThingOutcome;
use hearth_types::{
    Action, PairingTransactionId, Param, RuleId, StateTypeId, ThingClassId, ThingId, Value,
};

use crate::error::DispatcherResult;
use crate::snapshot::{RuleSnapshot, ThingSnapshot};

/// One mutation or query travelling into the core task.
///
/// Every command carries a oneshot responder; the dispatcher answers after
/// processing the command to completion. External surfaces (RPC, scripts)
/// never touch the registry or engine directly — single-task ownership
/// makes locking unnecessary.
#[derive(Debug)]
pub enum CoreCommand {
    /// Add a configured thing (or open a pairing flow).
    AddThing {
        /// The class to instantiate.
        thing_class_id: ThingClassId,
        /// Display name.
        name: String,
        /// Configuration params.
        params: Vec<Param>,
        /// Parent thing for hierarchies.
        parent_id: Option<ThingId>,
        /// Answered once the thing exists or pairing started.
        respond: oneshot::Sender<DispatcherResult<AddThingOutcome>>,
    },
    /// Confirm an in-flight pairing.
    ConfirmPairing {
        /// The transaction being confirmed.
        transaction_id: PairingTransactionId,
        /// The user-supplied secret.
        secret: Option<String>,
        /// Answered after the confirm step was dispatched.
        respond: oneshot::Sender<DispatcherResult<()>>,
    },
    /// Re-run a thing's setup with new params.
    ReconfigureThing {
        /// The thing to reconfigure.
        thing_id: ThingId,
        /// The new params.
        params: Vec<Param>,
        /// Answered after setup was re-dispatched.
        respond: oneshot::Sender<DispatcherResult<()>>,
    },
    /// Remove a thing, applying the policy to referencing rules first.
    RemoveThing {
        /// The thing to remove.
        thing_id: ThingId,
        /// What happens to referencing rules.
        policy: RemovePolicy,
        /// Answered after rules were cleaned and the thing removed.
        respond: oneshot::Sender<DispatcherResult<()>>,
    },
    /// Execute an action; answered when the plugin (or its watchdog)
    /// completes it.
    ExecuteAction {
        /// The action to execute.
        action: Action,
        /// Answered with the completion status.
        respond: oneshot::Sender<DispatcherResult<ReplyStatus>>,
    },
    /// Run a discovery; answered with the found candidates.
    Discover {
        /// The class to discover.
        thing_class_id: ThingClassId,
        /// Discovery params.
        params: Vec<Param>,
        /// Answered when the discovery finishes or times out.
        respond: oneshot::Sender<DispatcherResult<Vec<ThingDescriptor>>>,
    },
    /// Add a thing from a previously discovered descriptor.
    AddDiscoveredThing {
        /// The descriptor to materialize.
        descriptor: ThingDescriptor,
        /// Answered once the thing exists.
        respond: oneshot::Sender<DispatcherResult<ThingId>>,
    },
    /// Add a rule.
    AddRule {
        /// The rule to add.
        rule: Box<Rule>,
        /// Answered with the stored rule's id.
        respond: oneshot::Sender<DispatcherResult<RuleId>>,
    },
    /// Remove a rule.
    RemoveRule {
        /// The rule to remove.
        rule_id: RuleId,
        /// Answered after removal.
        respond: oneshot::Sender<DispatcherResult<()>>,
    },
    /// Enable or disable a rule.
    EnableRule {
        /// The rule to toggle.
        rule_id: RuleId,
        /// The new enablement.
        enabled: bool,
        /// Answered after the change persisted.
        respond: oneshot::Sender<DispatcherResult<()>>,
    },
    /// Write a state value (scripts, virtual devices).
    SetStateValue {
        /// The owning thing.
        thing_id: ThingId,
        /// The state to write.
        state_type_id: StateTypeId,
        /// The new value.
        value: Value,
        /// Answered with whether a change was committed.
        respond: oneshot::Sender<DispatcherResult<bool>>,
    },
    /// Read a state value.
    GetStateValue {
        /// The owning thing.
        thing_id: ThingId,
        /// The state to read.
        state_type_id: StateTypeId,
        /// Answered with the current value, `None` when unknown.
        respond: oneshot::Sender<Option<Value>>,
    },
    /// Snapshot all configured things.
    GetThings {
        /// Answered with one snapshot per thing.
        respond: oneshot::Sender<Vec<ThingSnapshot>>,
    },
    /// Snapshot all rules.
    GetRules {
        /// Answered with one snapshot per rule.
        respond: oneshot::Sender<Vec<RuleSnapshot>>,
    },
    /// A clock tick (from the 1 Hz source or an explicit injection).
    Tick(NaiveDateTime),
    /// Stop the control loop.
    Shutdown,
}
