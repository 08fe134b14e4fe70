//! Resource kinds.
//!
//! Modules and components share one lifecycle; a [`ResourceKind`] marker
//! carries the handful of names that differ between them, and a
//! [`TeardownPolicy`] value carries the one behavior that may differ.

/// Runtime variable holding the gateway's local address.
pub const GATEWAY_LOCAL_IP_VAR: &str = "GATEWAY_LOCAL_IP";

/// Compile-time profile of one resource kind.
pub trait ResourceKind: Send + Sync + 'static {
    /// Singular name used in logs and worker names, e.g. `module`.
    const NAME: &'static str;
    /// Collection segment of the inbound API, e.g. `modules`.
    const COLLECTION: &'static str;
    /// Runtime variable under which the resource id is handed to its services.
    const ID_VAR: &'static str;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Module;

impl ResourceKind for Module {
    const NAME: &'static str = "module";
    const COLLECTION: &'static str = "modules";
    const ID_VAR: &'static str = "MODULE_ID";
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Component;

impl ResourceKind for Component {
    const NAME: &'static str = "component";
    const COLLECTION: &'static str = "components";
    const ID_VAR: &'static str = "COMPONENT_ID";
}

/// How services are torn down when a resource is deactivated or removed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TeardownPolicy {
    /// Delete every service after stopping it on deactivation.
    pub delete_on_deactivate: bool,
    /// Ask the deployment service to purge service data on deletion.
    pub purge_on_remove: bool,
}
