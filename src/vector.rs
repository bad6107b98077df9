//! Stream network and pour points as GeoJSON.

use std::fs;
use std::path::Path;

use geojson::{Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use ndarray::Array2;
use serde_json::json;

use crate::d8::{downstream, neighbour, D8_CODES};
use crate::error::Result;
use crate::raster::Raster;
use crate::snap::SnappedPoint;

/// One stretch of stream between a head or confluence and the next confluence or outlet.
#[derive(Debug, Clone, PartialEq)]
pub struct StreamLink {
    pub id: usize,
    /// Cells from upstream to downstream; the last one is shared with the downstream link.
    pub cells: Vec<(usize, usize)>,
    /// Cell centres in map units.
    pub coords: Vec<(f64, f64)>,
}

/// Number of stream neighbours draining into each stream cell.
fn stream_in_degree(streams: &Array2<u8>, d8: &Array2<u8>) -> Array2<u8> {
    let (rows, columns) = streams.dim();
    Array2::from_shape_fn((rows, columns), |(row, col)| {
        if streams[[row, col]] != 1 {
            return 0;
        }
        (0..8)
            .filter(|&n| {
                neighbour(row, col, n, rows, columns).is_some_and(|(rn, cn)| {
                    streams[[rn, cn]] == 1 && d8[[rn, cn]] == D8_CODES[(n + 4) % 8]
                })
            })
            .count() as u8
    })
}

/// Traces the stream raster into links following the D8 pointer.
///
/// A link starts at every stream cell that does not have exactly one stream cell draining
/// into it (channel heads and confluences) and runs downstream until the flow leaves the
/// network or enters the next confluence.  Links are numbered from 1 in row-major order of
/// their first cell.  Single-cell links are dropped.
pub fn stream_links(streams: &Raster<u8>, d8: &Raster<u8>) -> Result<Vec<StreamLink>> {
    streams.same_grid(d8)?;
    let (rows, columns) = streams.shape();
    let in_degree = stream_in_degree(&streams.data, &d8.data);

    let mut links = vec![];
    for ((row, col), &deg) in in_degree.indexed_iter() {
        if streams.data[[row, col]] != 1 || deg == 1 {
            continue;
        }
        let mut cells = vec![(row, col)];
        let (mut r, mut c) = (row, col);
        while let Some((rn, cn)) = downstream(r, c, d8.data[[r, c]], rows, columns) {
            if streams.data[[rn, cn]] != 1 || cells.len() > rows * columns {
                break;
            }
            cells.push((rn, cn));
            if in_degree[[rn, cn]] != 1 {
                break;
            }
            (r, c) = (rn, cn);
        }
        if cells.len() < 2 {
            continue;
        }
        let coords = cells
            .iter()
            .map(|&(r, c)| streams.transform.cell_center(r, c))
            .collect();
        links.push(StreamLink {
            id: links.len() + 1,
            cells,
            coords,
        });
    }
    Ok(links)
}

fn properties(value: serde_json::Value) -> Option<JsonObject> {
    match value {
        serde_json::Value::Object(map) => Some(map),
        _ => None,
    }
}

/// Stream links as `LineString` features with `link_id` and `cells` properties.
pub fn links_to_geojson(links: &[StreamLink]) -> FeatureCollection {
    let features = links
        .iter()
        .map(|link| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::LineString(
                link.coords.iter().map(|&(x, y)| vec![x, y]).collect(),
            ))),
            id: None,
            properties: properties(json!({
                "link_id": link.id,
                "cells": link.cells.len(),
            })),
            foreign_members: None,
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

/// Snapped pour points as `Point` features, keeping the requested location and snap distance.
pub fn pour_points_to_geojson(points: &[SnappedPoint]) -> FeatureCollection {
    let features = points
        .iter()
        .map(|p| Feature {
            bbox: None,
            geometry: Some(Geometry::new(Value::Point(vec![p.x, p.y]))),
            id: None,
            properties: properties(json!({
                "row": p.row,
                "col": p.col,
                "requested_x": p.requested.0,
                "requested_y": p.requested.1,
                "snap_distance": p.distance,
            })),
            foreign_members: None,
        })
        .collect();
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub fn write_geojson(collection: FeatureCollection, path: &Path) -> Result<()> {
    fs::write(path, GeoJson::from(collection).to_string())?;
    Ok(())
}
