//! hearth-rpc — the JSON-RPC boundary contract of the hearth controller.
//!
//! Typed reflection of the catalogue and the core's operations for
//! external clients: `Integrations.*`, `Rules.*`, `States.*`, and a
//! notification subscription. This crate is the contract plus the
//! [`RpcService`] adapter over a running dispatcher — transport servers
//! (TCP, WebSocket, TLS) stay outside the core and consume
//! [`RpcService::into_module`].

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod api;
pub mod dto;
pub mod service;

pub use api::{IntegrationsApiServer, RulesApiServer, StatesApiServer};
pub use dto::{
    AddThingRequest, AddThingResponse, EvaluateRuleResponse, ExecuteActionRequest,
    ExecuteActionResponse, ThingClassDto, VendorDto,
};
pub use service::RpcService;
