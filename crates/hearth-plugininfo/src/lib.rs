//! hearth-plugininfo — typed id constants from plugin metadata.
//!
//! Plugin authors describe their vendor, classes, and schemas in one JSON
//! document. This generator turns that document into a Rust module of id
//! constants and schema-name constants, so plugin code references
//! `virtual_switch::POWER_STATE_TYPE_ID` instead of pasting UUID literals.
//! Typical usage is a build script writing the module into `OUT_DIR`.

#![deny(unsafe_code)]
#![deny(missing_docs)]
#![deny(clippy::unwrap_used)]
#![cfg_attr(test, allow(clippy::unwrap_used))]

use std::fmt::Write as _;

use hearth_types::PluginMetadata;
use hearth_types::metadata::ThingClassMeta;

/// Render the constants module for one metadata document.
#[must_use]
pub fn generate(metadata: &PluginMetadata) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "// Generated by hearth-plugininfo from the '{}' plugin metadata.",
        metadata.name
    );
    let _ = writeln!(out, "// Do not edit; regenerate instead.");
    let _ = writeln!(out);
    let _ = writeln!(out, "#![allow(unused)]");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "use hearth_types::{{ActionTypeId, EventTypeId, ParamTypeId, PluginId, StateTypeId, ThingClassId, VendorId}};"
    );
    let _ = writeln!(out, "use uuid::uuid;");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "pub const PLUGIN_ID: PluginId = PluginId::from_uuid(uuid!(\"{}\"));",
        metadata.id
    );

    for vendor in &metadata.vendors {
        let _ = writeln!(
            out,
            "pub const {}_VENDOR_ID: VendorId = VendorId::from_uuid(uuid!(\"{}\"));",
            screaming_case(&vendor.name),
            vendor.id
        );
        for class in &vendor.thing_classes {
            generate_class(&mut out, class);
        }
    }
    out
}

fn generate_class(out: &mut String, class: &ThingClassMeta) {
    let _ = writeln!(out);
    let _ = writeln!(out, "/// Ids of the `{}` thing class.", class.name);
    let _ = writeln!(out, "pub mod {} {{", snake_case(&class.name));
    let _ = writeln!(out, "    use super::*;");
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "    pub const THING_CLASS_ID: ThingClassId = ThingClassId::from_uuid(uuid!(\"{}\"));",
        class.id
    );

    for param in &class.param_types {
        let _ = writeln!(
            out,
            "    pub const {}_PARAM_TYPE_ID: ParamTypeId = ParamTypeId::from_uuid(uuid!(\"{}\"));",
            screaming_case(&param.name),
            param.id
        );
    }
    for state in &class.state_types {
        let name = screaming_case(&state.name);
        let _ = writeln!(
            out,
            "    pub const {name}_STATE_TYPE_ID: StateTypeId = StateTypeId::from_uuid(uuid!(\"{}\"));",
            state.id
        );
        if state.writable {
            // The mirror action shares the state's UUID.
            let _ = writeln!(
                out,
                "    pub const {name}_ACTION_TYPE_ID: ActionTypeId = ActionTypeId::from_uuid(uuid!(\"{}\"));",
                state.id
            );
            let _ = writeln!(
                out,
                "    pub const {name}_ACTION_PARAM_TYPE_ID: ParamTypeId = ParamTypeId::from_uuid(uuid!(\"{}\"));",
                state.id
            );
        }
    }
    for event in &class.event_types {
        let _ = writeln!(
            out,
            "    pub const {}_EVENT_TYPE_ID: EventTypeId = EventTypeId::from_uuid(uuid!(\"{}\"));",
            screaming_case(&event.name),
            event.id
        );
        for param in &event.param_types {
            let _ = writeln!(
                out,
                "    pub const {}_PARAM_TYPE_ID: ParamTypeId = ParamTypeId::from_uuid(uuid!(\"{}\"));",
                screaming_case(&param.name),
                param.id
            );
        }
    }
    for action in class
        .action_types
        .iter()
        .chain(&class.browser_item_action_types)
    {
        let _ = writeln!(
            out,
            "    pub const {}_ACTION_TYPE_ID: ActionTypeId = ActionTypeId::from_uuid(uuid!(\"{}\"));",
            screaming_case(&action.name),
            action.id
        );
        for param in &action.param_types {
            let _ = writeln!(
                out,
                "    pub const {}_PARAM_TYPE_ID: ParamTypeId = ParamTypeId::from_uuid(uuid!(\"{}\"));",
                screaming_case(&param.name),
                param.id
            );
        }
    }
    let _ = writeln!(out, "}}");
}

/// `virtualSwitch` → `virtual_switch`.
fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    for c in name.chars() {
        if c.is_ascii_uppercase() {
            out.push('_');
            out.push(c.to_ascii_lowercase());
        } else if c.is_ascii_alphanumeric() {
            out.push(c);
        } else {
            out.push('_');
        }
    }
    out.trim_matches('_').to_string()
}

/// `buttonName` → `BUTTON_NAME`.
fn screaming_case(name: &str) -> String {
    snake_case(name).to_ascii_uppercase()
}
