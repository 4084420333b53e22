//! Read-only catalog boundary: published layers and the style registry.

use std::collections::HashMap;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Kinds of resources the engine can shape limits for. Closed set: a new
/// kind cannot be added without updating the limits builder.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ResourceKind {
    Vector,
    Raster,
    MapService,
}

/// Catalog view of a published layer.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogResource {
    pub workspace: String,
    pub name: String,
    pub kind: ResourceKind,
    /// EPSG code of the resource's native coordinate reference system.
    pub native_srid: i32,
}

impl CatalogResource {
    pub fn new(
        workspace: impl Into<String>,
        name: impl Into<String>,
        kind: ResourceKind,
        native_srid: i32,
    ) -> Self {
        Self {
            workspace: workspace.into(),
            name: name.into(),
            kind,
            native_srid,
        }
    }
}

/// A named rendering style from the style registry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleDef {
    pub name: String,
    /// Styled-layer-descriptor document body.
    pub body: String,
}

impl StyleDef {
    pub fn new(name: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            body: body.into(),
        }
    }
}

/// Read-only lookup of layers and styles published by the host.
#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    async fn layer_resource(&self, layer: &str) -> Option<CatalogResource>;

    async fn style_by_name(&self, name: &str) -> Option<StyleDef>;
}

/// Catalog backed by in-process maps; used for embedding and tests.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    layers: HashMap<String, CatalogResource>,
    styles: HashMap<String, StyleDef>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_layer(mut self, resource: CatalogResource) -> Self {
        self.layers.insert(resource.name.clone(), resource);
        self
    }

    pub fn with_style(mut self, style: StyleDef) -> Self {
        self.styles.insert(style.name.clone(), style);
        self
    }
}

#[async_trait]
impl ResourceCatalog for InMemoryCatalog {
    async fn layer_resource(&self, layer: &str) -> Option<CatalogResource> {
        self.layers.get(layer).cloned()
    }

    async fn style_by_name(&self, name: &str) -> Option<StyleDef> {
        self.styles.get(name).cloned()
    }
}
