//! hearth-rules — the declarative rule engine of the hearth controller.
//!
//! A rule composes three condition families — [`EventDescriptor`]s,
//! a [`TimeDescriptor`](hearth_time::TimeDescriptor), and a
//! [`StateEvaluator`] tree — with an action list and an optional exit-action
//! list. The [`RuleEngine`] owns every rule and produces ordered, resolved
//! [`Action`](hearth_types::Action) lists when events arrive, states change,
//! or the clock ticks.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

pub mod action;
pub mod descriptor;
pub mod engine;
pub mod error;
pub mod evaluator;
pub mod rule;

pub use action::{ActionTarget, RuleAction, RuleActionParam, RuleActionParamValue};
pub use descriptor::{EventDescriptor, EventMatch, ParamFilter};
pub use engine::{RemovePolicy, RuleEngine};
pub use error::{RuleError, RuleResult};
pub use evaluator::{StateDescriptor, StateEvaluator, StateMatch, StateOperator};
pub use rule::Rule;
