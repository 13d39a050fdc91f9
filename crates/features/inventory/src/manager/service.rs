use super::Manager;
use crate::error::InventoryError;
use crate::events::{Event, Trigger};
use pim_bus::{Arg, BusError, Inbound, Message, MethodCall, Reply, names};
use pim_domain::object::relativize;
use pim_domain::status::ManagerStatus;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

impl Manager {
    /// Runs the startup events, then makes the manager reachable.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Bus`] if the well-known name cannot be claimed.
    pub fn start(&mut self) -> Result<(), InventoryError> {
        let events = Arc::clone(&self.events);
        for event in events.iter().filter(|e| *e.trigger() == Trigger::Startup) {
            debug!(event = %event.name(), "Running startup event");
            self.handle_event(event, None);
        }

        let name = self.config.bus.name.clone();
        self.bus.request_name(&name)?;
        self.status = ManagerStatus::Running;
        info!(%name, objects = self.store.len(), "Inventory manager running");
        Ok(())
    }

    /// Serves the inbound queue until [`Self::shutdown`] or the bus goes away.
    ///
    /// # Errors
    ///
    /// [`InventoryError::Validation`] on a second run, or whatever [`Self::start`] reports.
    pub async fn run(&mut self) -> Result<(), InventoryError> {
        let mut inbound = self.inbound.take().ok_or_else(|| InventoryError::Validation {
            message: "inbound queue already consumed".into(),
            context: Some("A manager runs once".into()),
        })?;
        self.start()?;

        while self.status != ManagerStatus::Stopping {
            let Some(item) = inbound.recv().await else {
                debug!("Inbound queue closed");
                break;
            };
            self.process(item);
        }
        info!("Inventory manager stopped");
        Ok(())
    }

    /// Handles one unit of inbound work to completion.
    pub fn process(&mut self, item: Inbound) {
        match item {
            Inbound::Call { call, reply } => {
                let result = self.handle_call(&call);
                if let Err(err) = &result {
                    debug!(path = %call.path, member = %call.member, error = %err, "Method call failed");
                }
                if reply.send(result).is_err() {
                    trace!(member = %call.member, "Caller went away before the reply");
                }
            },
            Inbound::Signal { matched, message } => {
                let Some(&index) = self.matches.get(&matched) else {
                    warn!(%matched, "Signal for an unknown match");
                    return;
                };
                let events = Arc::clone(&self.events);
                if let Some(event) = events.get(index) {
                    trace!(event = %event.name(), path = %message.path, "Dispatching signal");
                    self.handle_event(event, Some(&message));
                }
            },
            Inbound::Shutdown => self.shutdown(),
        }
    }

    /// Asks the run loop to stop after the current message.
    pub fn shutdown(&mut self) {
        debug!("Inventory manager stopping");
        self.status = ManagerStatus::Stopping;
    }

    /// Filters short-circuit on the first `false`; a failing action drops the
    /// rest of this event only.
    pub fn handle_event(&mut self, event: &Event, message: Option<&Message>) {
        let bus = Arc::clone(&self.bus);
        for filter in event.filters() {
            if !filter.evaluate(bus.as_ref(), message, self) {
                trace!(event = %event.name(), "Event filtered out");
                return;
            }
        }
        for action in event.actions() {
            if let Err(err) = action.run(bus.as_ref(), self) {
                error!(event = %event.name(), error = %err, "Event action failed");
                return;
            }
        }
    }

    fn handle_call(&mut self, call: &MethodCall) -> Result<Reply, BusError> {
        match (call.interface.as_str(), call.member.as_str()) {
            (names::INVENTORY_MANAGER, names::NOTIFY) => {
                let objects = call
                    .args
                    .iter()
                    .find_map(|arg| match arg {
                        Arg::Objects(objects) => Some(objects.clone()),
                        _ => None,
                    })
                    .ok_or_else(|| invalid_args("Notify expects an object map"))?;
                self.notify(objects);
                Ok(Reply::empty())
            },
            (names::PROPERTIES, names::GET) => {
                let (interface, property) = string_pair(call)?;
                let path = self.hosted_path(call)?;
                self.get_property(&path, interface, property).map(Reply::with).map_err(reply_error)
            },
            (names::PROPERTIES, names::GET_ALL) => {
                let interface = call.str_arg(0).ok_or_else(|| invalid_args("GetAll expects an interface"))?;
                let path = self.hosted_path(call)?;
                self.get_all(&path, interface).map(Reply::with).map_err(reply_error)
            },
            (names::PROPERTIES, names::SET) => {
                let (interface, property) = string_pair(call)?;
                let Some(Arg::Value(value)) = call.args.get(2) else {
                    return Err(invalid_args("Set expects a value"));
                };
                let path = self.hosted_path(call)?;
                self.set_property(&path, interface, property, value.clone())
                    .map(|_| Reply::empty())
                    .map_err(reply_error)
            },
            (names::OBJECT_MANAGER, names::GET_MANAGED_OBJECTS) => {
                Ok(Reply::with(self.managed_objects()))
            },
            (interface, member) => Err(BusError::UnknownMethod {
                message: format!("{interface}.{member}").into(),
                context: Some(call.path.clone().into()),
            }),
        }
    }

    /// Maps the object path a call was addressed to onto a root-relative path.
    fn hosted_path(&self, call: &MethodCall) -> Result<String, BusError> {
        relativize(&self.root, &call.path).map(str::to_owned).ok_or_else(|| BusError::UnknownMethod {
            message: format!("{} is outside the inventory root", call.path).into(),
            context: Some(self.root.clone().into()),
        })
    }
}

fn string_pair(call: &MethodCall) -> Result<(&str, &str), BusError> {
    call.str_arg(0)
        .zip(call.str_arg(1))
        .ok_or_else(|| invalid_args("expected an interface and a property name"))
}

fn invalid_args(message: &'static str) -> BusError {
    BusError::InvalidArgs { message: message.into(), context: None }
}

fn reply_error(err: InventoryError) -> BusError {
    let message = err.to_string().into();
    match err {
        InventoryError::NotFound { .. } | InventoryError::UnsupportedInterface { .. } => {
            BusError::UnknownMethod { message, context: None }
        },
        InventoryError::Interface { .. } => BusError::InvalidArgs { message, context: None },
        _ => BusError::RemoteCall { message, context: None },
    }
}
