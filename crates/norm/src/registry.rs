//! Process-wide descriptor cache.
//!
//! Descriptors are built lazily on first use and shared afterwards. Entities
//! derived with `#[derive(Entity)]` also register themselves through
//! `inventory`, so [`warm_all`] can build every descriptor up front and
//! surface mapping errors at startup.

use crate::descriptor::{DescriptorBuilder, Entity, EntityDescriptor};
use crate::error::NormResult;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock, PoisonError, RwLock};

type Slot = Arc<dyn Any + Send + Sync>;

fn cache() -> &'static RwLock<HashMap<TypeId, Slot>> {
    static CACHE: OnceLock<RwLock<HashMap<TypeId, Slot>>> = OnceLock::new();
    CACHE.get_or_init(|| RwLock::new(HashMap::new()))
}

/// An entity registered for startup warm-up.
pub struct EntityRegistration {
    pub type_name: &'static str,
    pub warm: fn() -> NormResult<()>,
}

inventory::collect!(EntityRegistration);

/// The shared descriptor for `T`, building it on first use.
///
/// Concurrent first callers may each build a descriptor; the first one
/// published wins and every caller gets that instance.
pub fn descriptor_of<T: Entity>() -> NormResult<Arc<EntityDescriptor<T>>> {
    let key = TypeId::of::<T>();

    let cached = cache()
        .read()
        .unwrap_or_else(PoisonError::into_inner)
        .get(&key)
        .cloned();
    if let Some(slot) = cached {
        if let Ok(descriptor) = slot.downcast::<EntityDescriptor<T>>() {
            return Ok(descriptor);
        }
    }

    let built = T::describe(DescriptorBuilder::for_type())?.build()?;
    tracing::debug!(
        target: "norm.registry",
        entity = built.meta().type_name(),
        table = built.table(),
        columns = built.meta().columns().len(),
        "built entity descriptor"
    );

    let slot = cache()
        .write()
        .unwrap_or_else(PoisonError::into_inner)
        .entry(key)
        .or_insert_with(|| Arc::new(built) as Slot)
        .clone();

    slot.downcast::<EntityDescriptor<T>>().map_err(|_| {
        crate::error::NormError::mapping(format!(
            "descriptor cache holds a different type for {}",
            std::any::type_name::<T>()
        ))
    })
}

/// Build every registered entity's descriptor. Returns how many were built.
pub fn warm_all() -> NormResult<usize> {
    let mut count = 0;
    for registration in inventory::iter::<EntityRegistration> {
        (registration.warm)()?;
        count += 1;
    }
    tracing::debug!(target: "norm.registry", entities = count, "descriptor cache warmed");
    Ok(count)
}

/// Names of every entity registered through `#[derive(Entity)]`.
pub fn registered_entities() -> Vec<&'static str> {
    inventory::iter::<EntityRegistration>
        .into_iter()
        .map(|r| r.type_name)
        .collect()
}

/// Number of descriptors currently cached.
pub fn cached_count() -> usize {
    cache().read().unwrap_or_else(PoisonError::into_inner).len()
}
