use super::{Filter, PathCondition};
use crate::manager::Manager;
use pim_bus::{Body, Bus, Message, MethodCall};
use pim_domain::object::relativize;
use pim_domain::value::Value;
use tracing::{debug, warn};

/// Always passes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopFilter;

impl Filter for NoopFilter {
    fn evaluate(&self, _bus: &dyn Bus, _message: Option<&Message>, _manager: &mut Manager) -> bool {
        true
    }
}

/// Passes when the triggering `PropertiesChanged` reports `property` of
/// `interface` with exactly `value`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyChangedTo {
    pub interface: String,
    pub property: String,
    pub value: Value,
}

impl Filter for PropertyChangedTo {
    fn evaluate(&self, _bus: &dyn Bus, message: Option<&Message>, _manager: &mut Manager) -> bool {
        let Some(Message { body: Body::PropertiesChanged { interface, changed, .. }, .. }) = message
        else {
            return false;
        };
        interface == &self.interface && changed.get(&self.property) == Some(&self.value)
    }
}

/// Passes when a property currently holds `value`, wherever it is hosted.
///
/// The filter form inspects `path` as given; the path condition form is
/// handed absolute paths by the action that fans out.
///
/// The owning service is resolved through the object mapper unless `service`
/// names it. When the owner is this manager the store is read directly;
/// otherwise the property is fetched over the bus. Any failure fails closed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyIs {
    /// Object to inspect; path conditions supply it per call instead.
    pub path: Option<String>,
    pub interface: String,
    pub property: String,
    pub value: Value,
    pub service: Option<String>,
}

impl PropertyIs {
    fn holds(&self, path: &str, bus: &dyn Bus, manager: &mut Manager) -> bool {
        let host = match &self.service {
            Some(service) => service.clone(),
            None => match resolve_owner(bus, path, &self.interface) {
                Some(owner) => owner,
                None => return false,
            },
        };

        let actual = if bus.owns_name(&host) {
            let Some(local) = relativize(manager.root(), path) else {
                debug!(%path, root = %manager.root(), "Local object outside the inventory root");
                return false;
            };
            match manager.get_property(local, &self.interface, &self.property) {
                Ok(value) => value,
                Err(err) => {
                    debug!(%path, interface = %self.interface, error = %err, "Local property read failed");
                    return false;
                },
            }
        } else {
            let call = MethodCall::get_property(&host, path, &self.interface, &self.property);
            match bus.call(call).map(|reply| reply.first_value().cloned()) {
                Ok(Some(value)) => value,
                Ok(None) => {
                    warn!(%path, service = %host, "Property reply carried no value");
                    return false;
                },
                Err(err) => {
                    warn!(%path, service = %host, error = %err, "Remote property read failed");
                    return false;
                },
            }
        };
        actual == self.value
    }
}

fn resolve_owner(bus: &dyn Bus, path: &str, interface: &str) -> Option<String> {
    match bus.call(MethodCall::get_object(path, interface)) {
        Ok(reply) => {
            let owner = reply.owners().and_then(|owners| owners.keys().next().cloned());
            if owner.is_none() {
                debug!(%path, %interface, "Object mapper knows no owner");
            }
            owner
        },
        Err(err) => {
            warn!(%path, %interface, error = %err, "Object mapper lookup failed");
            None
        },
    }
}

impl Filter for PropertyIs {
    fn evaluate(&self, bus: &dyn Bus, _message: Option<&Message>, manager: &mut Manager) -> bool {
        let Some(path) = &self.path else {
            warn!(interface = %self.interface, "property_is filter declared without a path");
            return false;
        };
        self.holds(path, bus, manager)
    }
}

impl PathCondition for PropertyIs {
    fn check(&self, path: &str, bus: &dyn Bus, manager: &mut Manager) -> bool {
        self.holds(path, bus, manager)
    }
}
