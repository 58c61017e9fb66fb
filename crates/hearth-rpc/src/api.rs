//! The JSON-RPC trait contract.
//!
//! Three namespaces mirror the core's surfaces; method schemas derive from
//! the type catalogue, so the wire shapes are the catalogue's own serde
//! forms. Transport servers are out of scope — callers merge the generated
//! module into whatever server they run.

use jsonrpsee::core::{RpcResult, SubscriptionResult};
use jsonrpsee::proc_macros::rpc;

use hearth_runtime::{RuleSnapshot, ThingSnapshot};
use hearth_rules::Rule;
use hearth_types::{RuleId, StateTypeId, ThingId, Value};

use crate::dto::{
    AddThingRequest, AddThingResponse, EvaluateRuleResponse, ExecuteActionRequest,
    ExecuteActionResponse, ThingClassDto, VendorDto,
};

/// Device-integration methods.
#[rpc(server, namespace = "Integrations")]
pub trait IntegrationsApi {
    /// All vendors the loaded plugins provide.
    #[method(name = "GetSupportedVendors")]
    async fn get_supported_vendors(&self) -> RpcResult<Vec<VendorDto>>;

    /// All thing classes, full schemas included.
    #[method(name = "GetThingClasses")]
    async fn get_thing_classes(&self) -> RpcResult<Vec<ThingClassDto>>;

    /// All configured things.
    #[method(name = "GetConfiguredThings")]
    async fn get_configured_things(&self) -> RpcResult<Vec<ThingSnapshot>>;

    /// Add a configured thing, possibly opening a pairing flow.
    #[method(name = "AddConfiguredThing")]
    async fn add_configured_thing(&self, request: AddThingRequest) -> RpcResult<AddThingResponse>;

    /// Confirm an in-flight pairing with the user's secret.
    #[method(name = "ConfirmPairing")]
    async fn confirm_pairing(
        &self,
        transaction_id: hearth_types::PairingTransactionId,
        secret: Option<String>,
    ) -> RpcResult<()>;

    /// Remove a configured thing. `remove_policy` is `"cascade"` or
    /// `"updateRules"`.
    #[method(name = "RemoveConfiguredThing")]
    async fn remove_configured_thing(
        &self,
        thing_id: ThingId,
        remove_policy: String,
    ) -> RpcResult<()>;

    /// Execute an action and wait for its completion status.
    #[method(name = "ExecuteAction")]
    async fn execute_action(
        &self,
        request: ExecuteActionRequest,
    ) -> RpcResult<ExecuteActionResponse>;
}

/// Rule methods.
#[rpc(server, namespace = "Rules")]
pub trait RulesApi {
    /// All rules, in evaluation order.
    #[method(name = "GetRules")]
    async fn get_rules(&self) -> RpcResult<Vec<RuleSnapshot>>;

    /// Add a rule; the wire shape is the rule's serde form.
    #[method(name = "AddRule")]
    async fn add_rule(&self, rule: Rule) -> RpcResult<RuleId>;

    /// Remove a rule.
    #[method(name = "RemoveRule")]
    async fn remove_rule(&self, rule_id: RuleId) -> RpcResult<()>;

    /// Enable or disable a rule.
    #[method(name = "EnableRule")]
    async fn enable_rule(&self, rule_id: RuleId, enabled: bool) -> RpcResult<()>;

    /// The rule's computed activity right now.
    #[method(name = "EvaluateRule")]
    async fn evaluate_rule(&self, rule_id: RuleId) -> RpcResult<EvaluateRuleResponse>;
}

/// State methods and the notification stream.
#[rpc(server, namespace = "States")]
pub trait StatesApi {
    /// Read one state value.
    #[method(name = "GetStateValue")]
    async fn get_state_value(
        &self,
        thing_id: ThingId,
        state_type_id: StateTypeId,
    ) -> RpcResult<Value>;

    /// Stream every core notification (thing, state, and rule changes).
    #[subscription(
        name = "SubscribeNotifications",
        unsubscribe = "UnsubscribeNotifications",
        item = hearth_events::Notification
    )]
    async fn subscribe_notifications(&self) -> SubscriptionResult;
}
