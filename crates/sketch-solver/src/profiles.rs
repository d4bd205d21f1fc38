use std::collections::HashMap;

use sketch_types::{ClosedProfile, EntityId, PointId, ProfileSegment, SketchEntity, SketchPoint};

/// Extract closed profiles from solved sketch geometry.
///
/// Minimal-face detection on the planar graph of lines and arcs:
/// 1. Build two directed half-edges per entity
/// 2. Sort each vertex's outgoing edges by departure angle
/// 3. Walk faces with the tightest-turn rule; keep only walks that close
///    back onto their starting edge
/// 4. Classify winding with the shoelace formula (CCW = outer, CW = hole)
/// 5. Drop the unbounded face (the largest clockwise walk)
///
/// Arcs are treated as straight chords for angle sorting and winding;
/// that is exact enough to order and classify the loops this solver
/// produces, and the emitted segments carry the true center for the
/// downstream kernel.
pub fn extract_profiles(
    points: &[SketchPoint],
    entities: &[SketchEntity],
) -> Vec<ClosedProfile> {
    let positions: HashMap<PointId, (f64, f64)> =
        points.iter().map(|p| (p.id, (p.x, p.y))).collect();

    let mut edges: Vec<DirectedEdge> = Vec::new();
    for entity in entities {
        let (start, end) = entity.endpoints();
        edges.push(DirectedEdge {
            from: start,
            to: end,
            entity: entity.id(),
        });
        edges.push(DirectedEdge {
            from: end,
            to: start,
            entity: entity.id(),
        });
    }

    if edges.is_empty() {
        return Vec::new();
    }

    let mut adjacency: HashMap<PointId, Vec<DirectedEdge>> = HashMap::new();
    for edge in &edges {
        adjacency.entry(edge.from).or_default().push(*edge);
    }
    for (vertex, out_edges) in adjacency.iter_mut() {
        let from_pos = match positions.get(vertex) {
            Some(p) => *p,
            None => continue,
        };
        out_edges.sort_by(|a, b| {
            let angle_a = departure_angle(from_pos, &positions, a);
            let angle_b = departure_angle(from_pos, &positions, b);
            angle_a
                .partial_cmp(&angle_b)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
    }

    let mut used: HashMap<(PointId, PointId, EntityId), bool> = HashMap::new();
    for edge in &edges {
        used.insert(edge.key(), false);
    }

    let mut faces: Vec<Vec<DirectedEdge>> = Vec::new();
    for edge in &edges {
        if used[&edge.key()] {
            continue;
        }

        let mut walk: Vec<DirectedEdge> = Vec::new();
        let mut closed = false;
        let mut current = *edge;

        loop {
            match used.get_mut(&current.key()) {
                Some(u) if !*u => *u = true,
                _ => break,
            }
            walk.push(current);

            match next_half_edge(&adjacency, &current, &positions) {
                Some(next) if next.key() == edge.key() => {
                    closed = true;
                    break;
                }
                Some(next) => current = next,
                None => break,
            }
        }

        if closed && walk.len() >= 2 {
            faces.push(walk);
        }
    }

    let mut profiles: Vec<ClosedProfile> = faces
        .iter()
        .map(|walk| {
            let vertices: Vec<PointId> = walk.iter().map(|e| e.from).collect();
            let winding = signed_area(&vertices, &positions);
            ClosedProfile {
                segments: walk
                    .iter()
                    .map(|e| segment_for(e, entities, &positions))
                    .collect(),
                is_outer: winding > 0.0,
            }
        })
        .collect();

    // The unbounded face wraps the whole sketch: it is the clockwise walk
    // with at least the area of the largest counter-clockwise one.
    let max_outer_area = profiles
        .iter()
        .filter(|p| p.is_outer)
        .map(|p| profile_area(p).abs())
        .fold(0.0_f64, f64::max);
    let unbounded = profiles
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.is_outer)
        .map(|(i, p)| (i, profile_area(p).abs()))
        .filter(|(_, area)| *area >= max_outer_area - 1e-9)
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i);
    if let Some(idx) = unbounded {
        profiles.remove(idx);
    }

    profiles
}

#[derive(Debug, Clone, Copy)]
struct DirectedEdge {
    from: PointId,
    to: PointId,
    entity: EntityId,
}

impl DirectedEdge {
    fn key(&self) -> (PointId, PointId, EntityId) {
        (self.from, self.to, self.entity)
    }
}

fn segment_for(
    edge: &DirectedEdge,
    entities: &[SketchEntity],
    positions: &HashMap<PointId, (f64, f64)>,
) -> ProfileSegment {
    let pos = |id: PointId| positions.get(&id).copied().unwrap_or((0.0, 0.0));
    let found = entities
        .iter()
        .find(|e| e.id() == edge.entity)
        .expect("profile edge references a sketch entity");
    match found {
        SketchEntity::Line { id, .. } => ProfileSegment::Line {
            entity: *id,
            start: pos(edge.from),
            end: pos(edge.to),
        },
        SketchEntity::Arc { id, center, .. } => ProfileSegment::Arc {
            entity: *id,
            center: pos(*center),
            start: pos(edge.from),
            end: pos(edge.to),
        },
    }
}

/// Angle at which a directed edge leaves its origin vertex.
fn departure_angle(
    from_pos: (f64, f64),
    positions: &HashMap<PointId, (f64, f64)>,
    edge: &DirectedEdge,
) -> f64 {
    let to_pos = positions.get(&edge.to).copied().unwrap_or((0.0, 0.0));
    (to_pos.1 - from_pos.1).atan2(to_pos.0 - from_pos.0)
}

/// Next half-edge in a minimal-face traversal: at the head vertex, take
/// the outgoing edge with the smallest counter-clockwise rotation from the
/// arrival direction, skipping the immediate reversal of the same entity.
fn next_half_edge(
    adjacency: &HashMap<PointId, Vec<DirectedEdge>>,
    current: &DirectedEdge,
    positions: &HashMap<PointId, (f64, f64)>,
) -> Option<DirectedEdge> {
    let out_edges = adjacency.get(&current.to)?;
    let vertex_pos = positions.get(&current.to)?;
    let from_pos = positions.get(&current.from)?;
    let incoming_angle = (from_pos.1 - vertex_pos.1).atan2(from_pos.0 - vertex_pos.0);

    let mut best: Option<DirectedEdge> = None;
    let mut best_delta = f64::MAX;
    for edge in out_edges {
        if edge.to == current.from && edge.entity == current.entity {
            continue;
        }
        let mut delta = departure_angle(*vertex_pos, positions, edge) - incoming_angle;
        while delta <= 0.0 {
            delta += std::f64::consts::TAU;
        }
        while delta > std::f64::consts::TAU {
            delta -= std::f64::consts::TAU;
        }
        if delta < best_delta {
            best_delta = delta;
            best = Some(*edge);
        }
    }
    best
}

/// Shoelace signed area; positive = CCW (outer), negative = CW (hole).
fn signed_area(vertices: &[PointId], positions: &HashMap<PointId, (f64, f64)>) -> f64 {
    if vertices.len() < 3 {
        return 0.0;
    }
    let mut area = 0.0;
    let n = vertices.len();
    for i in 0..n {
        let (x1, y1) = positions.get(&vertices[i]).copied().unwrap_or((0.0, 0.0));
        let (x2, y2) = positions
            .get(&vertices[(i + 1) % n])
            .copied()
            .unwrap_or((0.0, 0.0));
        area += x1 * y2 - x2 * y1;
    }
    area / 2.0
}

fn profile_area(profile: &ClosedProfile) -> f64 {
    let mut area = 0.0;
    let n = profile.segments.len();
    for i in 0..n {
        let (x1, y1) = profile.segments[i].start();
        let (x2, y2) = profile.segments[(i + 1) % n].start();
        area += x1 * y2 - x2 * y1;
    }
    area / 2.0
}
