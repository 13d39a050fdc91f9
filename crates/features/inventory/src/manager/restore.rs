use super::Manager;
use pim_domain::object::{ObjectMap, relativize};
use pim_domain::status::EmissionPolicy;
use pim_storage::StorageError;
use tracing::{debug, error, info};

impl Manager {
    /// Rebuilds the store from persistence. Runs once, before the manager is reachable.
    pub(crate) fn restore(&mut self) {
        let skeleton = match self.persistence.skeleton(&self.root) {
            Ok(skeleton) => skeleton,
            Err(StorageError::DirectoryNotFound { .. }) => {
                debug!(root = %self.persistence.root().display(), "Nothing to restore");
                return;
            },
            Err(err) => {
                error!(error = %err, "Failed to scan persisted state");
                return;
            },
        };

        let skeleton: ObjectMap = skeleton
            .into_iter()
            .filter_map(|(path, object)| {
                let rel = relativize(&self.root, &path)?.to_owned();
                Some((rel, object))
            })
            .collect();
        let count = skeleton.len();
        self.update_objects(skeleton, true);
        info!(objects = count, "Restored persisted inventory");

        self.resolve_restored_conditions();
    }

    /// Records what restore observed for each pending condition, then retries them.
    fn resolve_restored_conditions(&mut self) {
        let Some(associations) = self.associations.as_mut() else {
            return;
        };
        if !associations.pending_condition() {
            return;
        }

        for condition in associations.conditions_mut() {
            condition.actual_value = self
                .store
                .interface(&condition.path, &condition.interface)
                .zip(self.registry.get(&condition.interface).ok())
                .and_then(|(handle, maker)| maker.get_property(&condition.property, handle));
        }

        if associations.condition_match_actual() {
            for path in self.store.paths() {
                associations.create_associations(path, EmissionPolicy::Suppressed);
            }
        }
    }
}
