//! The type catalogue.
//!
//! Built once per plugin load from declarative metadata, then read-only:
//! lookup of vendors, thing classes, and every schema entry, plus
//! schema-directed value validation. Load-time verification rejects defective
//! schemas so the rest of the core never sees them.

use std::collections::{HashMap, HashSet};

use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{CatalogueError, CatalogueResult, ValidationError, ValidationResult};
use crate::ids::{ActionTypeId, EventTypeId, ParamTypeId, PluginId, StateTypeId, ThingClassId, VendorId};
use crate::interface::{Interface, builtin_interfaces};
use crate::metadata::PluginMetadata;
use crate::param::ParamType;
use crate::thing_class::{ThingClass, Vendor};
use crate::value::ValueOperator;

const LOG: &str = "type_catalogue";

/// What the catalogue retains about a loaded plugin.
#[derive(Debug, Clone)]
pub struct PluginRecord {
    /// Unique id of the plugin.
    pub id: PluginId,
    /// Machine name.
    pub name: String,
    /// Human-readable name.
    pub display_name: String,
    /// Tracing target the plugin logs under.
    pub debug_category: String,
    /// Plugin-global configuration schema.
    pub config_param_types: Vec<ParamType>,
}

/// Read-only lookup over every descriptor the loaded plugins declare.
#[derive(Debug, Default)]
pub struct TypeCatalogue {
    plugins: HashMap<PluginId, PluginRecord>,
    vendors: HashMap<VendorId, Vendor>,
    thing_classes: HashMap<ThingClassId, ThingClass>,
    interfaces: HashMap<String, Interface>,
    param_types: HashMap<ParamTypeId, ParamType>,
    state_owner: HashMap<StateTypeId, ThingClassId>,
    event_owner: HashMap<EventTypeId, ThingClassId>,
    action_owner: HashMap<ActionTypeId, ThingClassId>,
}

impl TypeCatalogue {
    /// Create a catalogue knowing only the built-in interfaces.
    #[must_use]
    pub fn new() -> Self {
        let mut catalogue = Self::default();
        for interface in builtin_interfaces() {
            catalogue.interfaces.insert(interface.name.clone(), interface);
        }
        catalogue
    }

    /// Register an additional interface definition.
    pub fn register_interface(&mut self, interface: Interface) {
        self.interfaces.insert(interface.name.clone(), interface);
    }

    /// Load one plugin's metadata into the catalogue.
    ///
    /// Rejects defective schemas: duplicate ids within the plugin (per id
    /// kind), inverted param ranges, allowed values of the wrong type,
    /// writable states whose mirror action is missing or mismatched, and
    /// unknown or unsatisfied interfaces.
    ///
    /// # Errors
    ///
    /// Returns the first [`CatalogueError`] found; on error nothing from the
    /// plugin is registered.
    pub fn register_plugin(&mut self, metadata: &PluginMetadata) -> CatalogueResult<()> {
        let plugin_id = metadata.id;
        let config_param_types = metadata.config_param_types()?;
        let mut vendors = Vec::new();
        let mut classes = Vec::new();
        for vendor_meta in &metadata.vendors {
            vendors.push(vendor_meta.resolve());
            for class_meta in &vendor_meta.thing_classes {
                classes.push(class_meta.resolve(plugin_id, vendor_meta.id)?);
            }
        }

        self.verify_plugin(plugin_id, &vendors, &classes)?;

        for vendor in vendors {
            debug!(target: LOG, vendor = %vendor.name, "registered vendor");
            self.vendors.insert(vendor.id, vendor);
        }
        for class in classes {
            self.index_class(&class);
            debug!(target: LOG, class = %class.name, id = %class.id, "registered thing class");
            self.thing_classes.insert(class.id, class);
        }
        self.plugins.insert(
            plugin_id,
            PluginRecord {
                id: plugin_id,
                name: metadata.name.clone(),
                display_name: metadata
                    .display_name
                    .clone()
                    .unwrap_or_else(|| metadata.name.clone()),
                debug_category: metadata.debug_category().to_string(),
                config_param_types,
            },
        );
        info!(target: LOG, plugin = %metadata.name, "loaded plugin metadata");
        Ok(())
    }

    fn verify_plugin(
        &self,
        plugin_id: PluginId,
        vendors: &[Vendor],
        classes: &[ThingClass],
    ) -> CatalogueResult<()> {
        let mut seen_vendor = HashSet::new();
        let mut seen_class = HashSet::new();
        let mut seen_param = HashSet::new();
        let mut seen_state = HashSet::new();
        let mut seen_event = HashSet::new();
        let mut seen_action = HashSet::new();

        let duplicate = |id: Uuid| CatalogueError::DuplicateId {
            plugin_id,
            id: id.as_hyphenated().to_string(),
        };

        for vendor in vendors {
            if !seen_vendor.insert(vendor.id) {
                return Err(duplicate(vendor.id.as_uuid()));
            }
        }

        for class in classes {
            if !seen_class.insert(class.id) || self.thing_classes.contains_key(&class.id) {
                return Err(duplicate(class.id.as_uuid()));
            }

            let class_param_sets = [
                &class.param_types,
                &class.settings_types,
                &class.discovery_param_types,
            ];
            let payload_param_sets = class
                .event_types
                .iter()
                .map(|et| &et.param_types)
                .chain(class.action_types.iter().map(|at| &at.param_types))
                .chain(class.browser_item_action_types.iter().map(|at| &at.param_types));
            for pt in class_param_sets
                .into_iter()
                .chain(payload_param_sets)
                .flatten()
            {
                if !seen_param.insert(pt.id) {
                    return Err(duplicate(pt.id.as_uuid()));
                }
                verify_param_schema(pt)?;
            }

            for st in &class.state_types {
                if !seen_state.insert(st.id) {
                    return Err(duplicate(st.id.as_uuid()));
                }
                verify_state_schema(class, st)?;
            }
            for et in &class.event_types {
                if !seen_event.insert(et.id) {
                    return Err(duplicate(et.id.as_uuid()));
                }
            }
            for at in class.action_types.iter().chain(&class.browser_item_action_types) {
                if !seen_action.insert(at.id) {
                    return Err(duplicate(at.id.as_uuid()));
                }
            }

            for name in &class.interfaces {
                let interface = self.interfaces.get(name).ok_or_else(|| {
                    CatalogueError::UnknownInterface {
                        thing_class_id: class.id,
                        interface: name.clone(),
                    }
                })?;
                if !interface.is_satisfied_by(class) {
                    return Err(CatalogueError::Metadata(format!(
                        "thing class '{}' declares interface '{name}' but lacks its members",
                        class.name
                    )));
                }
            }
        }
        Ok(())
    }

    fn index_class(&mut self, class: &ThingClass) {
        for pt in class
            .param_types
            .iter()
            .chain(&class.settings_types)
            .chain(&class.discovery_param_types)
            .chain(class.event_types.iter().flat_map(|et| &et.param_types))
            .chain(class.action_types.iter().flat_map(|at| &at.param_types))
            .chain(
                class
                    .browser_item_action_types
                    .iter()
                    .flat_map(|at| &at.param_types),
            )
        {
            self.param_types.insert(pt.id, pt.clone());
        }
        for st in &class.state_types {
            self.state_owner.insert(st.id, class.id);
        }
        for et in &class.event_types {
            self.event_owner.insert(et.id, class.id);
        }
        for at in class.action_types.iter().chain(&class.browser_item_action_types) {
            self.action_owner.insert(at.id, class.id);
        }
    }

    /// Look up a loaded plugin record.
    #[must_use]
    pub fn plugin(&self, id: PluginId) -> Option<&PluginRecord> {
        self.plugins.get(&id)
    }

    /// All loaded plugin records.
    pub fn plugins(&self) -> impl Iterator<Item = &PluginRecord> {
        self.plugins.values()
    }

    /// Look up a vendor.
    #[must_use]
    pub fn vendor(&self, id: VendorId) -> Option<&Vendor> {
        self.vendors.get(&id)
    }

    /// All vendors.
    pub fn vendors(&self) -> impl Iterator<Item = &Vendor> {
        self.vendors.values()
    }

    /// Look up a thing class.
    #[must_use]
    pub fn thing_class(&self, id: ThingClassId) -> Option<&ThingClass> {
        self.thing_classes.get(&id)
    }

    /// All thing classes.
    pub fn thing_classes(&self) -> impl Iterator<Item = &ThingClass> {
        self.thing_classes.values()
    }

    /// Look up an interface by name.
    #[must_use]
    pub fn interface(&self, name: &str) -> Option<&Interface> {
        self.interfaces.get(name)
    }

    /// Every class implementing the named interface.
    pub fn classes_implementing<'a>(
        &'a self,
        interface: &'a str,
    ) -> impl Iterator<Item = &'a ThingClass> {
        self.thing_classes
            .values()
            .filter(move |class| class.implements(interface))
    }

    /// Look up a param type anywhere in the catalogue.
    #[must_use]
    pub fn param_type(&self, id: ParamTypeId) -> Option<&ParamType> {
        self.param_types.get(&id)
    }

    /// The class declaring a state type.
    #[must_use]
    pub fn thing_class_for_state(&self, id: StateTypeId) -> Option<&ThingClass> {
        self.state_owner.get(&id).and_then(|c| self.thing_classes.get(c))
    }

    /// The class declaring an event type.
    #[must_use]
    pub fn thing_class_for_event(&self, id: EventTypeId) -> Option<&ThingClass> {
        self.event_owner.get(&id).and_then(|c| self.thing_classes.get(c))
    }

    /// The class declaring an action type.
    #[must_use]
    pub fn thing_class_for_action(&self, id: ActionTypeId) -> Option<&ThingClass> {
        self.action_owner.get(&id).and_then(|c| self.thing_classes.get(c))
    }

    /// Validate one value against a param type known to the catalogue.
    ///
    /// # Errors
    ///
    /// [`ValidationError::UnknownParam`] when the id is not in the catalogue,
    /// otherwise whatever the schema check reports.
    pub fn validate_param(
        &self,
        param_type_id: ParamTypeId,
        value: &crate::value::Value,
    ) -> ValidationResult {
        let pt = self
            .param_types
            .get(&param_type_id)
            .ok_or(ValidationError::UnknownParam { param_type_id })?;
        pt.validate(value)
    }
}

fn verify_param_schema(pt: &ParamType) -> CatalogueResult<()> {
    if let (Some(min), Some(max)) = (&pt.min_value, &pt.max_value)
        && !ValueOperator::LessOrEqual.evaluate(min, max)
    {
        return Err(CatalogueError::InvertedRange {
            param_type_id: pt.id,
            name: pt.name.clone(),
        });
    }
    for value in &pt.allowed_values {
        if !value.matches(pt.value_type) {
            return Err(CatalogueError::AllowedValueType {
                param_type_id: pt.id,
                name: pt.name.clone(),
                value: value.clone(),
            });
        }
    }
    Ok(())
}

fn verify_state_schema(class: &ThingClass, st: &crate::state::StateType) -> CatalogueResult<()> {
    if let (Some(min), Some(max)) = (&st.min_value, &st.max_value)
        && !ValueOperator::LessOrEqual.evaluate(min, max)
    {
        return Err(CatalogueError::InvertedRange {
            param_type_id: ParamTypeId::from_uuid(st.id.as_uuid()),
            name: st.name.clone(),
        });
    }
    if st.writable {
        let action_id = ActionTypeId::from_uuid(st.id.as_uuid());
        let Some(action) = class.action_type(action_id) else {
            return Err(CatalogueError::MissingStateAction {
                state_type_id: st.id,
                name: st.name.clone(),
            });
        };
        let mirrors = action.param_types.len() == 1
            && action.param_types[0].id.as_uuid() == st.id.as_uuid()
            && action.param_types[0].value_type == st.value_type;
        if !mirrors {
            return Err(CatalogueError::StateActionMismatch {
                action_type_id: action_id,
                name: st.name.clone(),
            });
        }
    }
    Ok(())
}
