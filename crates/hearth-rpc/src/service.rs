//! The RPC service: the contract implemented over a dispatcher handle.

use std::sync::Arc;

use jsonrpsee::core::{RpcResult, SubscriptionResult};
use jsonrpsee::types::ErrorObjectOwned;
use jsonrpsee::{PendingSubscriptionSink, RpcModule, SubscriptionMessage};
use tracing::debug;

use hearth_events::NotificationBus;
use hearth_rules::{RemovePolicy, Rule};
use hearth_runtime::{DispatcherError, DispatcherHandle, RuleSnapshot, ThingSnapshot};
use hearth_types::{
    Action, PairingTransactionId, RuleId, StateTypeId, ThingId, TriggeredBy, TypeCatalogue, Value,
};

use crate::api::{IntegrationsApiServer, RulesApiServer, StatesApiServer};
use crate::dto::{
    AddThingRequest, AddThingResponse, EvaluateRuleResponse, ExecuteActionRequest,
    ExecuteActionResponse, ThingClassDto, VendorDto,
};

const LOG: &str = "rpc";

/// Error codes of the boundary, alongside the JSON-RPC standard ones.
mod codes {
    pub const NOT_FOUND: i32 = -32001;
    pub const INVALID_PARAMS: i32 = -32602;
    pub const OPERATION_FAILED: i32 = -32002;
    pub const UNAVAILABLE: i32 = -32003;
}

/// The RPC boundary over a running dispatcher.
#[derive(Debug, Clone)]
pub struct RpcService {
    catalogue: Arc<TypeCatalogue>,
    handle: DispatcherHandle,
    bus: NotificationBus,
}

impl RpcService {
    /// Assemble the service.
    #[must_use]
    pub fn new(
        catalogue: Arc<TypeCatalogue>,
        handle: DispatcherHandle,
        bus: NotificationBus,
    ) -> Self {
        Self {
            catalogue,
            handle,
            bus,
        }
    }

    /// The merged module carrying all three namespaces, ready to be served
    /// by any jsonrpsee transport.
    ///
    /// # Errors
    ///
    /// Registration conflicts, which indicate a programming error in the
    /// trait definitions.
    pub fn into_module(self) -> Result<RpcModule<()>, jsonrpsee::core::RegisterMethodError> {
        let mut module = RpcModule::new(());
        module.merge(IntegrationsApiServer::into_rpc(self.clone()))?;
        module.merge(RulesApiServer::into_rpc(self.clone()))?;
        module.merge(StatesApiServer::into_rpc(self))?;
        Ok(module)
    }
}

fn rpc_error(code: i32, message: impl Into<String>) -> ErrorObjectOwned {
    ErrorObjectOwned::owned(code, message.into(), None::<()>)
}

fn map_error(error: &DispatcherError) -> ErrorObjectOwned {
    use hearth_things::ThingError;
    match error {
        DispatcherError::Thing(ThingError::NotFound(_) | ThingError::ClassNotFound(_)) => {
            rpc_error(codes::NOT_FOUND, error.to_string())
        },
        DispatcherError::Thing(ThingError::Param(_)) | DispatcherError::Rule(_) => {
            rpc_error(codes::INVALID_PARAMS, error.to_string())
        },
        DispatcherError::CoreStopped => rpc_error(codes::UNAVAILABLE, error.to_string()),
        _ => rpc_error(codes::OPERATION_FAILED, error.to_string()),
    }
}

#[jsonrpsee::core::async_trait]
impl IntegrationsApiServer for RpcService {
    async fn get_supported_vendors(&self) -> RpcResult<Vec<VendorDto>> {
        let mut vendors: Vec<VendorDto> = self.catalogue.vendors().map(VendorDto::from).collect();
        vendors.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(vendors)
    }

    async fn get_thing_classes(&self) -> RpcResult<Vec<ThingClassDto>> {
        let mut classes: Vec<ThingClassDto> = self
            .catalogue
            .thing_classes()
            .map(|class| ThingClassDto {
                class: class.clone(),
            })
            .collect();
        classes.sort_by(|a, b| a.class.name.cmp(&b.class.name));
        Ok(classes)
    }

    async fn get_configured_things(&self) -> RpcResult<Vec<ThingSnapshot>> {
        self.handle.things().await.map_err(|e| map_error(&e))
    }

    async fn add_configured_thing(&self, request: AddThingRequest) -> RpcResult<AddThingResponse> {
        debug!(target: LOG, class = %request.thing_class_id, "AddConfiguredThing");
        self.handle
            .add_thing(
                request.thing_class_id,
                request.name,
                request.params,
                request.parent_id,
            )
            .await
            .map(AddThingResponse::from)
            .map_err(|e| map_error(&e))
    }

    async fn confirm_pairing(
        &self,
        transaction_id: PairingTransactionId,
        secret: Option<String>,
    ) -> RpcResult<()> {
        self.handle
            .confirm_pairing(transaction_id, secret)
            .await
            .map_err(|e| map_error(&e))
    }

    async fn remove_configured_thing(
        &self,
        thing_id: ThingId,
        remove_policy: String,
    ) -> RpcResult<()> {
        let policy = match remove_policy.as_str() {
            "cascade" => RemovePolicy::Cascade,
            "updateRules" => RemovePolicy::UpdateRules,
            other => {
                return Err(rpc_error(
                    codes::INVALID_PARAMS,
                    format!("unknown remove policy: {other}"),
                ));
            },
        };
        self.handle
            .remove_thing(thing_id, policy)
            .await
            .map_err(|e| map_error(&e))
    }

    async fn execute_action(
        &self,
        request: ExecuteActionRequest,
    ) -> RpcResult<ExecuteActionResponse> {
        let action = Action::new(
            request.action_type_id,
            request.thing_id,
            request.params,
            TriggeredBy::User,
        );
        let status = self
            .handle
            .execute_action(action)
            .await
            .map_err(|e| map_error(&e))?;
        Ok(ExecuteActionResponse { status })
    }
}

#[jsonrpsee::core::async_trait]
impl RulesApiServer for RpcService {
    async fn get_rules(&self) -> RpcResult<Vec<RuleSnapshot>> {
        self.handle.rules().await.map_err(|e| map_error(&e))
    }

    async fn add_rule(&self, rule: Rule) -> RpcResult<RuleId> {
        self.handle.add_rule(rule).await.map_err(|e| map_error(&e))
    }

    async fn remove_rule(&self, rule_id: RuleId) -> RpcResult<()> {
        self.handle
            .remove_rule(rule_id)
            .await
            .map_err(|e| map_error(&e))
    }

    async fn enable_rule(&self, rule_id: RuleId, enabled: bool) -> RpcResult<()> {
        self.handle
            .enable_rule(rule_id, enabled)
            .await
            .map_err(|e| map_error(&e))
    }

    async fn evaluate_rule(&self, rule_id: RuleId) -> RpcResult<EvaluateRuleResponse> {
        let rules = self.handle.rules().await.map_err(|e| map_error(&e))?;
        rules
            .iter()
            .find(|r| r.id == rule_id)
            .map(|r| EvaluateRuleResponse { active: r.active })
            .ok_or_else(|| rpc_error(codes::NOT_FOUND, format!("rule not found: {rule_id}")))
    }
}

#[jsonrpsee::core::async_trait]
impl StatesApiServer for RpcService {
    async fn get_state_value(
        &self,
        thing_id: ThingId,
        state_type_id: StateTypeId,
    ) -> RpcResult<Value> {
        self.handle
            .get_state_value(thing_id, state_type_id)
            .await
            .map_err(|e| map_error(&e))?
            .ok_or_else(|| {
                rpc_error(
                    codes::NOT_FOUND,
                    format!("no state {state_type_id} on thing {thing_id}"),
                )
            })
    }

    async fn subscribe_notifications(
        &self,
        pending: PendingSubscriptionSink,
    ) -> SubscriptionResult {
        let sink = pending.accept().await?;
        let mut receiver = self.bus.subscribe();
        tokio::spawn(async move {
            while let Some(notification) = receiver.recv().await {
                let Ok(message) = SubscriptionMessage::from_json(&*notification) else {
                    continue;
                };
                if sink.send(message).await.is_err() {
                    break;
                }
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dto::AddThingRequest;
    use hearth_things::ThingError;
    use hearth_types::ValidationError;

    #[test]
    fn test_error_mapping_codes() {
        let not_found = map_error(&DispatcherError::Thing(ThingError::NotFound(ThingId::new())));
        assert_eq!(not_found.code(), codes::NOT_FOUND);

        let bad_param = map_error(&DispatcherError::Thing(ThingError::Param(
            ValidationError::UnknownParam {
                param_type_id: hearth_types::ParamTypeId::new(),
            },
        )));
        assert_eq!(bad_param.code(), codes::INVALID_PARAMS);

        let stopped = map_error(&DispatcherError::CoreStopped);
        assert_eq!(stopped.code(), codes::UNAVAILABLE);

        let failed = map_error(&DispatcherError::Reply(
            hearth_plugins::ReplyStatus::Timeout,
        ));
        assert_eq!(failed.code(), codes::OPERATION_FAILED);
    }

    #[test]
    fn test_ids_cross_the_wire_hyphenated() {
        let request = AddThingRequest {
            thing_class_id: "2b3c4d5e-6f70-4182-93a4-b5c6d7e8f901".parse().unwrap(),
            name: "lamp".into(),
            params: Vec::new(),
            parent_id: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(
            json["thingClassId"],
            serde_json::json!("2b3c4d5e-6f70-4182-93a4-b5c6d7e8f901")
        );

        let back: AddThingRequest = serde_json::from_value(json).unwrap();
        assert_eq!(back.thing_class_id, request.thing_class_id);
    }

    #[test]
    fn test_add_thing_response_shapes() {
        let response = AddThingResponse::from(hearth_things::AddThingOutcome::PairingStarted {
            transaction_id: PairingTransactionId::new(),
            setup_method: hearth_types::SetupMethod::DisplayPin,
        });
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "pairingStarted");
        assert_eq!(json["setupMethod"], "displayPin");
    }
}
