//! Reconciler for converging one object at a time.

use super::client::{ClientError, PropagationPolicy, ResourceClient};
use crate::config::EngineConfig;
use crate::error::{ReconcileError, Stage};
use crate::object::{ManagedObject, ObjectKey};
use crate::patch::{self, Patch, PatchDecision};
use tracing::{debug, info};

/// What a successful reconciliation did.
#[derive(Debug, Clone, PartialEq)]
pub enum ReconcileOutcome {
    /// The object did not exist and was created.
    Created(ManagedObject),
    /// The live object already matched; it was re-read and left alone.
    NoOp(ManagedObject),
    /// The live object was patched.
    Patched(ManagedObject),
}

impl ReconcileOutcome {
    /// Returns the object as last seen in the store.
    pub fn object(&self) -> &ManagedObject {
        match self {
            ReconcileOutcome::Created(object)
            | ReconcileOutcome::NoOp(object)
            | ReconcileOutcome::Patched(object) => object,
        }
    }

    pub fn into_object(self) -> ManagedObject {
        match self {
            ReconcileOutcome::Created(object)
            | ReconcileOutcome::NoOp(object)
            | ReconcileOutcome::Patched(object) => object,
        }
    }

    /// Returns true if the store was written to.
    pub fn changed(&self) -> bool {
        !matches!(self, ReconcileOutcome::NoOp(_))
    }
}

/// ReconcilerBuilder is a builder for creating a Reconciler.
pub struct ReconcilerBuilder<'a, C: ResourceClient + ?Sized> {
    client: &'a C,
    config: EngineConfig,
}

impl<'a, C: ResourceClient + ?Sized> ReconcilerBuilder<'a, C> {
    /// Creates a new ReconcilerBuilder with the default configuration.
    pub fn new(client: &'a C) -> Self {
        ReconcilerBuilder {
            client,
            config: EngineConfig::default(),
        }
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the dotted paths left out of every diff.
    pub fn ignored_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.ignored_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Sets whether drifted objects get the full desired document.
    pub fn force(mut self, force: bool) -> Self {
        self.config.force = force;
        self
    }

    pub fn optimistic_lock(mut self, enabled: bool) -> Self {
        self.config.optimistic_lock = enabled;
        self
    }

    pub fn propagation_policy(mut self, policy: PropagationPolicy) -> Self {
        self.config.propagation_policy = policy;
        self
    }

    /// Builds the Reconciler.
    pub fn build(self) -> Reconciler<'a, C> {
        Reconciler {
            client: self.client,
            config: self.config,
        }
    }
}

/// Reconciler converges live objects toward their desired definitions.
///
/// It holds no state between calls: every reconciliation starts with a fresh
/// read of the live object.
pub struct Reconciler<'a, C: ResourceClient + ?Sized> {
    client: &'a C,
    config: EngineConfig,
}

/// Steps of a single reconciliation.
enum Phase {
    Fetching,
    Creating,
    Diffing(ManagedObject),
    Applying(Patch),
    Refreshing,
    Done(ReconcileOutcome),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Fetching => "fetching",
            Phase::Creating => "creating",
            Phase::Diffing(_) => "diffing",
            Phase::Applying(_) => "applying",
            Phase::Refreshing => "refreshing",
            Phase::Done(_) => "done",
        }
    }
}

impl<'a, C: ResourceClient + ?Sized> Reconciler<'a, C> {
    /// Creates a reconciler with the default configuration.
    pub fn new(client: &'a C) -> Self {
        ReconcilerBuilder::new(client).build()
    }

    /// Creates a new ReconcilerBuilder.
    pub fn builder(client: &'a C) -> ReconcilerBuilder<'a, C> {
        ReconcilerBuilder::new(client)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Creates `desired` if it does not exist, otherwise patches the live
    /// object toward it.
    ///
    /// `original` is the definition applied last time, if known. With it,
    /// fields and list elements that were removed from the definition are
    /// removed from the live object too, while changes made by others are
    /// kept.
    ///
    /// # Errors
    ///
    /// Returns an error naming the stage that failed. Nothing is retried.
    pub fn reconcile(
        &self,
        desired: &ManagedObject,
        original: Option<&ManagedObject>,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        self.run(desired, original, true)
    }

    /// Patches an existing object toward `desired`, ignoring any previously
    /// applied definition.
    ///
    /// # Errors
    ///
    /// A missing object is an error at the fetch stage.
    pub fn replace(&self, desired: &ManagedObject) -> Result<ReconcileOutcome, ReconcileError> {
        self.run(desired, None, false)
    }

    /// Computes the patch that `reconcile` would send against `live`,
    /// without writing anything.
    pub fn compute_patch(
        &self,
        desired: &ManagedObject,
        live: &ManagedObject,
        original: Option<&ManagedObject>,
    ) -> Result<PatchDecision, ReconcileError> {
        let type_info = self.client.type_info(desired.kind());
        patch::compute_patch(desired, live, original, &type_info, &self.config)
            .map_err(|e| ReconcileError::from_patch(desired.key(), Stage::Diff, e))
    }

    /// Creates `desired` unconditionally.
    ///
    /// # Errors
    ///
    /// An existing object is reported as an already-exists error.
    pub fn create(&self, desired: &ManagedObject) -> Result<ManagedObject, ReconcileError> {
        let created = self
            .client
            .create(desired.namespace(), desired)
            .map_err(|e| ReconcileError::from_client(desired.key(), Stage::Create, e))?;
        info!("created {}", created.key());
        Ok(created)
    }

    /// Deletes the object, returning false if it was already gone.
    pub fn delete(&self, key: &ObjectKey) -> Result<bool, ReconcileError> {
        match self.client.delete(key, self.config.propagation_policy) {
            Ok(()) => {
                info!(
                    "deleted {} (propagation {:?})",
                    key, self.config.propagation_policy
                );
                Ok(true)
            }
            Err(ClientError::NotFound) => {
                debug!("{} already deleted", key);
                Ok(false)
            }
            Err(err) => Err(ReconcileError::from_client(key, Stage::Delete, err)),
        }
    }

    /// Reconciles every object in turn. A failure does not stop the others;
    /// there is one result per object, in order.
    pub fn reconcile_all<'o, I>(&self, items: I) -> Vec<Result<ReconcileOutcome, ReconcileError>>
    where
        I: IntoIterator<Item = (&'o ManagedObject, Option<&'o ManagedObject>)>,
    {
        let results: Vec<_> = items
            .into_iter()
            .map(|(desired, original)| self.reconcile(desired, original))
            .collect();

        let failed = results.iter().filter(|r| r.is_err()).count();
        debug!("reconciled {} objects, {} failed", results.len(), failed);
        results
    }

    fn run(
        &self,
        desired: &ManagedObject,
        original: Option<&ManagedObject>,
        create_missing: bool,
    ) -> Result<ReconcileOutcome, ReconcileError> {
        let key = desired.key();
        let mut phase = Phase::Fetching;

        loop {
            debug!("{}: {}", key, phase.name());
            phase = match phase {
                Phase::Fetching => match self.client.get(key) {
                    Ok(live) => Phase::Diffing(live),
                    Err(ClientError::NotFound) if create_missing => Phase::Creating,
                    Err(err) => return Err(ReconcileError::from_client(key, Stage::Fetch, err)),
                },
                Phase::Creating => Phase::Done(ReconcileOutcome::Created(self.create(desired)?)),
                Phase::Diffing(live) => match self.compute_patch(desired, &live, original)? {
                    PatchDecision::NoOp => Phase::Refreshing,
                    PatchDecision::Apply(patch) => Phase::Applying(patch),
                },
                Phase::Applying(patch) => {
                    let patched = self
                        .client
                        .patch(key, patch.kind, &patch.bytes)
                        .map_err(|e| ReconcileError::from_client(key, Stage::Patch, e))?;
                    info!("patched {} ({} patch)", key, patch.kind);
                    Phase::Done(ReconcileOutcome::Patched(patched))
                }
                Phase::Refreshing => {
                    let live = self
                        .client
                        .get(key)
                        .map_err(|e| ReconcileError::from_client(key, Stage::Refresh, e))?;
                    Phase::Done(ReconcileOutcome::NoOp(live))
                }
                Phase::Done(outcome) => return Ok(outcome),
            };
        }
    }
}
