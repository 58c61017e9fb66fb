//! Wire shapes of the RPC surface.
//!
//! Ids cross the wire as lower-case hyphenated UUID strings (the typed ids'
//! serde form); values keep their tagged representation.

use serde::{Deserialize, Serialize};

use hearth_plugins::ReplyStatus;
use hearth_things::AddThingOutcome;
use hearth_types::{
    PairingTransactionId, Param, SetupMethod, ThingClass, ThingClassId, ThingId, Vendor,
};

/// One vendor, as clients see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VendorDto {
    /// The vendor's id.
    pub id: hearth_types::VendorId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
}

impl From<&Vendor> for VendorDto {
    fn from(vendor: &Vendor) -> Self {
        Self {
            id: vendor.id,
            name: vendor.name.clone(),
            display_name: vendor.display_name.clone(),
        }
    }
}

/// One thing class; method schemas derive from the catalogue, so the full
/// class document travels as-is.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThingClassDto {
    /// The full class schema.
    #[serde(flatten)]
    pub class: ThingClass,
}

/// Inputs of `Integrations.AddConfiguredThing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddThingRequest {
    /// The class to instantiate.
    pub thing_class_id: ThingClassId,
    /// Display name.
    pub name: String,
    /// Configuration params.
    #[serde(default)]
    pub params: Vec<Param>,
    /// Parent thing for hierarchies.
    #[serde(default)]
    pub parent_id: Option<ThingId>,
}

/// Result of `Integrations.AddConfiguredThing`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", tag = "status")]
pub enum AddThingResponse {
    /// The thing exists and setup is running.
    SetupStarted {
        /// The new thing's id.
        thing_id: ThingId,
    },
    /// Pairing is required; confirm with the transaction id.
    PairingStarted {
        /// Handle for the confirmation step.
        transaction_id: PairingTransactionId,
        /// The interaction style to complete.
        setup_method: SetupMethod,
    },
}

impl From<AddThingOutcome> for AddThingResponse {
    fn from(outcome: AddThingOutcome) -> Self {
        match outcome {
            AddThingOutcome::SetupStarted { thing_id } => Self::SetupStarted { thing_id },
            AddThingOutcome::PairingStarted {
                transaction_id,
                setup_method,
            } => Self::PairingStarted {
                transaction_id,
                setup_method,
            },
        }
    }
}

/// Inputs of `Integrations.ExecuteAction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionRequest {
    /// The target thing.
    pub thing_id: ThingId,
    /// The action type.
    pub action_type_id: hearth_types::ActionTypeId,
    /// Action params.
    #[serde(default)]
    pub params: Vec<Param>,
}

/// Result of `Integrations.ExecuteAction`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecuteActionResponse {
    /// How the plugin (or its watchdog) completed the action.
    pub status: ReplyStatus,
}

/// Result of `Rules.EvaluateRule`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvaluateRuleResponse {
    /// The rule's computed activity at the time of the call.
    pub active: bool,
}
