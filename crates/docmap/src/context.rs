//! The process-wide cache of entity descriptors.
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;

use crate::config::MappingConfig;
use crate::entity::PersistentEntity;
use crate::schema::{Entity, Schema};
use crate::{Error, Result};

/// A build slot. Failed builds are kept so every later lookup fails the same way.
type Slot = Arc<OnceLock<Result<Arc<dyn Any + Send + Sync>>>>;

/// The descriptor of an entity type together with its schema.
pub struct TypedEntity<T> {
    entity: Arc<PersistentEntity>,
    schema: Schema<T>,
}

/// Builds each entity descriptor at most once and shares it afterwards.
///
/// Concurrent first lookups of the same type wait for a single build. The registry lock is only
/// held to find the slot of a type, never while a schema or descriptor is being built.
pub struct MappingContext {
    config: MappingConfig,
    entities: Mutex<HashMap<TypeId, Slot>>,
}

impl<T> TypedEntity<T> {
    pub fn entity(&self) -> &Arc<PersistentEntity> {
        &self.entity
    }

    pub fn schema(&self) -> &Schema<T> {
        &self.schema
    }
}

impl MappingContext {
    pub fn new(config: MappingConfig) -> Self {
        Self {
            config,
            entities: Mutex::new(HashMap::new()),
        }
    }

    pub fn config(&self) -> &MappingConfig {
        &self.config
    }

    /// The descriptor of `T`, building it on first use.
    pub fn persistent_entity<T: Entity>(&self) -> Result<Arc<PersistentEntity>> {
        Ok(self.typed_entity::<T>()?.entity.clone())
    }

    /// The descriptor and schema of `T`, building them on first use.
    pub fn typed_entity<T: Entity>(&self) -> Result<Arc<TypedEntity<T>>> {
        let slot = self
            .entities
            .lock()
            .entry(TypeId::of::<T>())
            .or_default()
            .clone();
        let mut built = false;
        let result = slot.get_or_init(|| {
            built = true;
            self.build::<T>()
                .map(|typed| Arc::new(typed) as Arc<dyn Any + Send + Sync>)
        });
        if !built {
            tracing::trace!(entity = std::any::type_name::<T>(), "entity cache hit");
        }
        match result {
            Ok(typed) => typed
                .clone()
                .downcast::<TypedEntity<T>>()
                .map_err(|_| Error::UnexpectedType {
                    expected: std::any::type_name::<TypedEntity<T>>(),
                    found: "another cached entry",
                }),
            Err(err) => Err(err.clone()),
        }
    }

    /// Number of types resolved so far, including failed ones.
    pub fn len(&self) -> usize {
        self.entities.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn build<T: Entity>(&self) -> Result<TypedEntity<T>> {
        let schema = T::schema();
        match PersistentEntity::build(schema.definition(), &self.config) {
            Ok(entity) => Ok(TypedEntity {
                entity: Arc::new(entity),
                schema,
            }),
            Err(err) => {
                tracing::debug!(entity = %schema.definition().name, error = %err, "invalid entity");
                Err(err)
            }
        }
    }
}

impl Default for MappingContext {
    fn default() -> Self {
        Self::new(MappingConfig::default())
    }
}
