//! Binary snapshot of a sector graph.
//!
//! Layout, all little-endian `i32`: sector grid width and height, then one record per sector
//! in row-major order: representative point x, y, z; island id; link count; and per link the
//! neighbour sector x, y and the cached distance. A sector without a point stores island 0
//! and a zeroed point.

use crate::pathing::sector_graph::{SectorGraph, SectorLink, SectorNode, MAX_LINKS, NO_ISLAND};
use crate::world::map::{MapId, SectorCoord, WorldMap};
use crate::world::position::Point3D;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("snapshot i/o failed for {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("snapshot is {found:?} sectors but the map is {expected:?}")]
    DimensionMismatch { expected: (i32, i32), found: (i32, i32) },
    #[error("snapshot ends early")]
    Truncated,
    #[error("snapshot is corrupt: {0}")]
    Corrupt(String),
    #[error("no sector graph loaded for {0}")]
    NotLoaded(MapId),
}

pub fn encode(graph: &SectorGraph) -> Vec<u8> {
    let mut out = Vec::with_capacity(8 + graph.nodes().len() * 20);
    push(&mut out, graph.width());
    push(&mut out, graph.height());
    for node in graph.nodes() {
        let point = node.point.unwrap_or_default();
        push(&mut out, point.x);
        push(&mut out, point.y);
        push(&mut out, point.z);
        push(&mut out, if node.point.is_some() { node.island as i32 } else { 0 });
        push(&mut out, node.links.len() as i32);
        for link in &node.links {
            push(&mut out, link.to.x);
            push(&mut out, link.to.y);
            push(&mut out, link.distance);
        }
    }
    out
}

/// Decodes a snapshot for `map`; `expected` is the current map size in sectors.
pub fn decode(data: &[u8], map: MapId, expected: (i32, i32)) -> Result<SectorGraph, GraphError> {
    let mut reader = Reader { data, offset: 0 };
    let width = reader.next()?;
    let height = reader.next()?;
    if (width, height) != expected {
        return Err(GraphError::DimensionMismatch {
            expected,
            found: (width, height),
        });
    }

    let mut nodes = Vec::with_capacity((width * height).max(0) as usize);
    for index in 0..width * height {
        let (sx, sy) = (index % width, index / width);
        let point = Point3D::new(reader.next()?, reader.next()?, reader.next()?);
        let island = reader.next()?;
        let link_count = reader.next()?;
        if island < 0 {
            return Err(GraphError::Corrupt(format!("sector {sx}-{sy} has island {island}")));
        }
        if !(0..=MAX_LINKS as i32).contains(&link_count) {
            return Err(GraphError::Corrupt(format!(
                "sector {sx}-{sy} has {link_count} links"
            )));
        }
        let mut links = Vec::with_capacity(link_count as usize);
        for _ in 0..link_count {
            let to = SectorCoord::new(reader.next()?, reader.next()?);
            let distance = reader.next()?;
            let adjacent = (to.x - sx).abs() <= 1 && (to.y - sy).abs() <= 1 && (to.x, to.y) != (sx, sy);
            let inside = to.x >= 0 && to.y >= 0 && to.x < width && to.y < height;
            if !adjacent || !inside || distance < 0 {
                return Err(GraphError::Corrupt(format!(
                    "sector {sx}-{sy} links to {}-{} at distance {distance}",
                    to.x, to.y
                )));
            }
            links.push(SectorLink { to, distance });
        }
        let island = island as u32;
        nodes.push(SectorNode {
            point: (island != NO_ISLAND).then_some(point),
            island,
            links,
        });
    }
    if reader.offset != data.len() {
        return Err(GraphError::Corrupt(format!(
            "{} trailing bytes",
            data.len() - reader.offset
        )));
    }
    SectorGraph::from_parts(map, width, height, nodes)
}

pub fn save(graph: &SectorGraph, path: &Path) -> Result<(), GraphError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(|source| io_error(dir, source))?;
    }
    fs::write(path, encode(graph)).map_err(|source| io_error(path, source))?;
    log::info!(
        target: "shardnav::pathing::sector_graph",
        "exported sector graph for {} to {}",
        graph.map(),
        path.display()
    );
    Ok(())
}

/// Loads the snapshot for `map`, checking it against the map's current sector grid.
pub fn load(path: &Path, map: &dyn WorldMap) -> Result<SectorGraph, GraphError> {
    let data = fs::read(path).map_err(|source| io_error(path, source))?;
    let graph = decode(&data, map.id(), (map.sectors_wide(), map.sectors_high()))?;
    log::info!(
        target: "shardnav::pathing::sector_graph",
        "loaded sector graph for {} from {}: {}",
        map.id(),
        path.display(),
        graph.summary()
    );
    Ok(graph)
}

fn io_error(path: &Path, source: std::io::Error) -> GraphError {
    GraphError::Io {
        path: path.display().to_string(),
        source,
    }
}

fn push(out: &mut Vec<u8>, value: i32) {
    out.extend_from_slice(&value.to_le_bytes());
}

struct Reader<'a> {
    data: &'a [u8],
    offset: usize,
}

impl Reader<'_> {
    fn next(&mut self) -> Result<i32, GraphError> {
        let end = self.offset + 4;
        let bytes = self.data.get(self.offset..end).ok_or(GraphError::Truncated)?;
        self.offset = end;
        let mut raw = [0u8; 4];
        raw.copy_from_slice(bytes);
        Ok(i32::from_le_bytes(raw))
    }
}
