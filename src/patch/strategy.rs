//! Patch strategy selection.

use super::merge::create_merge_patch;
use super::structural::create_structural_patch;
use super::{Patch, PatchDecision, PatchKind, EMPTY_PATCH};
use crate::config::EngineConfig;
use crate::error::PatchError;
use crate::object::{decode, encode, ManagedObject, TypeInfo, TypeKind};
use crate::schema::PatchMeta;
use crate::value::Value;
use tracing::{debug, warn};

/// The generator chosen for a kind, with the metadata it needs.
#[derive(Debug, Clone, Copy)]
pub enum Strategy<'a> {
    Merge,
    Structural(&'a PatchMeta),
}

impl Strategy<'_> {
    pub fn patch_kind(&self) -> PatchKind {
        match self {
            Strategy::Merge => PatchKind::MergePatch,
            Strategy::Structural(_) => PatchKind::StructuralMergePatch,
        }
    }
}

/// Picks the patch generator for a kind.
///
/// Structural patches need resolvable field metadata and a kind whose shape
/// is fixed; everything else gets a generic merge patch. A structured kind
/// without usable metadata falls back to a merge patch instead of failing.
pub fn select_strategy(type_info: &TypeInfo) -> Strategy<'_> {
    match (type_info.kind, type_info.extension, &type_info.meta) {
        (TypeKind::Unstructured, _, _) => Strategy::Merge,
        (TypeKind::Structured, true, _) => Strategy::Merge,
        (TypeKind::Structured, false, Some(meta)) if meta.is_resolvable() => {
            Strategy::Structural(meta)
        }
        (TypeKind::Structured, false, _) => {
            warn!("structured kind has no usable merge metadata, falling back to a merge patch");
            Strategy::Merge
        }
    }
}

/// Computes the patch that moves `live` toward `desired`.
///
/// `original` is the previously applied definition, if the caller knows it;
/// only structural patches use it. Returns [`PatchDecision::NoOp`] when the
/// live object already matches.
pub fn compute_patch(
    desired: &ManagedObject,
    live: &ManagedObject,
    original: Option<&ManagedObject>,
    type_info: &TypeInfo,
    config: &EngineConfig,
) -> Result<PatchDecision, PatchError> {
    let strategy = select_strategy(type_info);
    debug!("computing {} patch for {}", strategy.patch_kind(), desired.key());

    let desired_doc = without_ignored(desired.document(), config);
    let desired_bytes = encode(&desired_doc)?;
    let live_bytes = encode(&without_ignored(live.document(), config))?;

    let bytes = match strategy {
        Strategy::Merge => create_merge_patch(&live_bytes, &desired_bytes)?,
        Strategy::Structural(meta) => {
            let original_bytes = original
                .map(|o| encode(&without_ignored(o.document(), config)))
                .transpose()?;
            create_structural_patch(&live_bytes, &desired_bytes, original_bytes.as_deref(), meta)?
        }
    };

    if bytes == EMPTY_PATCH {
        debug!("{} already converged", desired.key());
        return Ok(PatchDecision::NoOp);
    }

    let patch = if config.force {
        let mut document = desired_doc;
        if let Some(version) = live.resource_version() {
            stamp_resource_version(&mut document, version);
        }
        Patch::new(PatchKind::FullReplace, encode(&document)?)
    } else if let (true, Some(version)) = (config.optimistic_lock, live.resource_version()) {
        let mut document = decode(&bytes)?;
        stamp_resource_version(&mut document, version);
        Patch::new(strategy.patch_kind(), encode(&document)?)
    } else {
        Patch::new(strategy.patch_kind(), bytes)
    };

    debug!("{} patch for {}: {}", patch.kind, desired.key(), patch.as_str());
    Ok(PatchDecision::Apply(patch))
}

fn without_ignored(document: &Value, config: &EngineConfig) -> Value {
    let mut document = document.clone();
    for path in config.ignored_paths() {
        document.remove_path(&path);
    }
    document
}

fn stamp_resource_version(document: &mut Value, version: &str) {
    document.set_path(
        &["metadata", "resourceVersion"],
        Value::String(version.to_string()),
    );
}
