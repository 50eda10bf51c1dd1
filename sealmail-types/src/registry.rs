//! Lazily parsed, process-wide cache of type models.

use crate::{TypeError, TypeModel, TypeRef};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// An application's model document: `{ "version": .., "types": { .. } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppModel {
    pub version: String,
    pub types: BTreeMap<String, TypeModel>,
}

/// Resolves [`TypeRef`]s to their [`TypeModel`].
///
/// Model documents are registered as raw JSON per application and parsed
/// on the first lookup against that application. Parsed models are
/// cached for the lifetime of the registry and shared as `Arc`s, so
/// concurrent lookups only ever take the read lock once warmed up.
#[derive(Debug, Default)]
pub struct TypeModelRegistry {
    sources: HashMap<String, String>,
    parsed: RwLock<HashMap<String, Arc<HashMap<String, Arc<TypeModel>>>>>,
}

impl TypeModelRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the raw model document of `app`. Parsing is deferred.
    pub fn register_json(&mut self, app: impl Into<String>, json: impl Into<String>) {
        let app = app.into();
        self.parsed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&app);
        self.sources.insert(app, json.into());
    }

    /// Registers an already built model document.
    pub fn register_app(&mut self, app: impl Into<String>, model: AppModel) {
        let app = app.into();
        let types = Self::index(&app, model);
        self.parsed
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(app.clone(), Arc::new(types));
        self.sources.remove(&app);
    }

    /// Resolves the model for `type_ref`.
    pub fn resolve(&self, type_ref: &TypeRef) -> crate::Result<Arc<TypeModel>> {
        let types = self.app_types(type_ref.app())?;
        types
            .get(type_ref.type_name())
            .cloned()
            .ok_or_else(|| TypeError::UnknownType(type_ref.clone()))
    }

    fn app_types(&self, app: &str) -> crate::Result<Arc<HashMap<String, Arc<TypeModel>>>> {
        if let Some(types) = self
            .parsed
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(app)
        {
            return Ok(types.clone());
        }

        let source = self
            .sources
            .get(app)
            .ok_or_else(|| TypeError::UnknownApp(app.to_string()))?;
        let model: AppModel =
            serde_json::from_str(source).map_err(|source| TypeError::MalformedModel {
                app: app.to_string(),
                source,
            })?;
        let types = Arc::new(Self::index(app, model));

        // Another thread may have won the race; keep whichever landed first.
        let mut parsed = self.parsed.write().unwrap_or_else(PoisonError::into_inner);
        Ok(parsed.entry(app.to_string()).or_insert(types).clone())
    }

    fn index(app: &str, model: AppModel) -> HashMap<String, Arc<TypeModel>> {
        model
            .types
            .into_iter()
            .map(|(name, mut type_model)| {
                if type_model.name.is_empty() {
                    type_model.name = name.clone();
                }
                if type_model.app.is_empty() {
                    type_model.app = app.to_string();
                }
                if type_model.version.is_empty() {
                    type_model.version = model.version.clone();
                }
                (name, Arc::new(type_model))
            })
            .collect()
    }
}
