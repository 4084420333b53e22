//! Resource-shaped access limits and the builder rendering decisions into
//! them.

use geo::{Geometry, MultiPolygon};
use tracing::debug;

use geogate_rule_model::{AccessInfo, CatalogMode, GrantType};

use crate::catalog::{CatalogResource, ResourceKind};
use crate::errors::AccessError;
use crate::geometry::GeometryAdapter;
use crate::predicate::{parse_cql, Predicate};

/// Vector-resource permissions: feature predicates plus attribute lists.
#[derive(Clone, Debug, PartialEq)]
pub struct VectorLimits {
    pub catalog_mode: CatalogMode,
    pub read_filter: Predicate,
    pub write_filter: Predicate,
    /// `None` leaves every attribute visible.
    pub read_attributes: Option<Vec<String>>,
    pub write_attributes: Option<Vec<String>>,
}

/// Raster-resource permissions: read predicate plus a clipping area.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterLimits {
    pub catalog_mode: CatalogMode,
    pub read_filter: Predicate,
    pub area: Option<MultiPolygon<f64>>,
}

/// Cascaded map-service permissions.
#[derive(Clone, Debug, PartialEq)]
pub struct MapServiceLimits {
    pub catalog_mode: CatalogMode,
    pub read_filter: Predicate,
    pub area: Option<MultiPolygon<f64>>,
    /// The proxy may keep rendering through the remote server.
    pub allow_cascaded_rendering: bool,
}

/// Access limits rendered for one resource kind.
#[derive(Clone, Debug, PartialEq)]
pub enum AccessLimits {
    Vector(VectorLimits),
    Raster(RasterLimits),
    MapService(MapServiceLimits),
}

impl AccessLimits {
    /// Whether any read access remains.
    pub fn grants_read(&self) -> bool {
        match self {
            AccessLimits::Vector(limits) => limits.read_filter.grants_access(),
            AccessLimits::Raster(limits) => limits.read_filter.grants_access(),
            AccessLimits::MapService(limits) => limits.read_filter.grants_access(),
        }
    }
}

enum PropertyAccessMode {
    Read,
    Write,
}

/// Render `access` into limits shaped for `resource`.
///
/// Reprojection writes the native-CRS WKT back into `access`, so reusing
/// the same decision copy never transforms the area twice.
pub fn build_access_limits(
    resource: &CatalogResource,
    access: &mut AccessInfo,
    geometry: &dyn GeometryAdapter,
    catalog_mode: CatalogMode,
) -> Result<AccessLimits, AccessError> {
    if access.grant == GrantType::Deny {
        // Denial is absolute: rule filters and areas never soften it.
        return Ok(denied_limits(resource.kind, catalog_mode));
    }

    let mut read_filter = Predicate::Include;
    let mut write_filter = Predicate::Include;
    if let Some(cql) = &access.cql_filter_read {
        read_filter = parse_cql(cql)?;
    }
    if let Some(cql) = &access.cql_filter_write {
        write_filter = parse_cql(cql)?;
    }

    let read_attributes = project_attributes(access, PropertyAccessMode::Read);
    let write_attributes = project_attributes(access, PropertyAccessMode::Write);

    let area = resolve_area(resource, access, geometry)?;

    match resource.kind {
        ResourceKind::Vector => {
            if let Some(wkt) = access.area_wkt.clone() {
                let area_predicate = Predicate::intersects_area(wkt);
                read_filter = read_filter.and(area_predicate.clone());
                write_filter = write_filter.and(area_predicate);
            }
            Ok(AccessLimits::Vector(VectorLimits {
                catalog_mode,
                read_filter,
                write_filter,
                read_attributes,
                write_attributes,
            }))
        }
        ResourceKind::Raster => {
            let area = area
                .as_ref()
                .map(|geometry_area| geometry.to_multi_polygon(geometry_area))
                .transpose()?;
            Ok(AccessLimits::Raster(RasterLimits {
                catalog_mode,
                read_filter,
                area,
            }))
        }
        ResourceKind::MapService => {
            let area = area
                .as_ref()
                .map(|geometry_area| geometry.to_multi_polygon(geometry_area))
                .transpose()?;
            Ok(AccessLimits::MapService(MapServiceLimits {
                catalog_mode,
                read_filter,
                area,
                allow_cascaded_rendering: true,
            }))
        }
    }
}

/// Parse the restricted area and bring it into the resource's native
/// reference system, persisting the transformed WKT on the decision copy.
fn resolve_area(
    resource: &CatalogResource,
    access: &mut AccessInfo,
    geometry: &dyn GeometryAdapter,
) -> Result<Option<Geometry<f64>>, AccessError> {
    let Some(wkt) = access.area_wkt.clone() else {
        return Ok(None);
    };
    let mut area = geometry.parse_wkt(&wkt)?;
    if let Some(srid) = access.area_srid {
        if srid != resource.native_srid {
            debug!(
                from = srid,
                to = resource.native_srid,
                layer = %resource.name,
                "reprojecting the restricted area to the native reference system"
            );
            area = geometry.reproject(&area, srid, resource.native_srid)?;
            access.area_wkt = Some(geometry.to_wkt(&area));
            access.area_srid = Some(resource.native_srid);
        }
    }
    Ok(Some(area))
}

fn project_attributes(access: &AccessInfo, mode: PropertyAccessMode) -> Option<Vec<String>> {
    let attributes = access.attributes.as_ref()?;
    Some(
        attributes
            .iter()
            .filter(|attribute| match mode {
                PropertyAccessMode::Read => attribute.readable(),
                PropertyAccessMode::Write => attribute.writable(),
            })
            .map(|attribute| attribute.name.clone())
            .collect(),
    )
}

fn denied_limits(kind: ResourceKind, catalog_mode: CatalogMode) -> AccessLimits {
    match kind {
        ResourceKind::Vector => AccessLimits::Vector(VectorLimits {
            catalog_mode,
            read_filter: Predicate::Exclude,
            write_filter: Predicate::Exclude,
            read_attributes: Some(Vec::new()),
            write_attributes: Some(Vec::new()),
        }),
        ResourceKind::Raster => AccessLimits::Raster(RasterLimits {
            catalog_mode,
            read_filter: Predicate::Exclude,
            area: None,
        }),
        ResourceKind::MapService => AccessLimits::MapService(MapServiceLimits {
            catalog_mode,
            read_filter: Predicate::Exclude,
            area: None,
            allow_cascaded_rendering: false,
        }),
    }
}
