// Radial layout for the energy-flow diagram
//
// Projects sources -> faculties -> buildings onto a 2D canvas. Sources sit on
// a horizontal row through the center, faculties on a ring around it, and each
// faculty's buildings on an arc around the faculty node.

use crate::diagram::LayoutConfig;
use crate::model::{EnergySource, FacultyGroups, SourceId};
use crate::palette::{ColorToken, SourcePalette};
use serde::{Deserialize, Serialize};
use std::f64::consts::TAU;

/// Measured drawing area. Zero until the host reports its size.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub width: f64,
    pub height: f64,
}

impl Viewport {
    pub fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }

    pub fn is_measured(&self) -> bool {
        self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NodeKind {
    Source,
    Faculty,
    Building,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeDetail {
    Source {
        source_id: SourceId,
        label: String,
        color: ColorToken,
    },
    Faculty {
        name: String,
        building_count: usize,
        sources: Vec<SourceId>,
    },
    Building {
        building_id: i64,
        name: String,
        faculty_name: String,
        active_sources: Vec<SourceId>,
    },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutNode {
    /// Stable across renders, used for keyed diffing
    pub id: String,
    pub x: f64,
    pub y: f64,
    #[serde(flatten)]
    pub detail: NodeDetail,
}

impl LayoutNode {
    pub fn kind(&self) -> NodeKind {
        match self.detail {
            NodeDetail::Source { .. } => NodeKind::Source,
            NodeDetail::Faculty { .. } => NodeKind::Faculty,
            NodeDetail::Building { .. } => NodeKind::Building,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LinkKind {
    /// Source -> faculty
    Primary,
    /// Faculty -> building, one per active source
    Secondary,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LayoutLink {
    pub id: String,
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
    pub color: ColorToken,
    pub kind: LinkKind,
    /// Renderer hint: the link's building is selected
    pub active: bool,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct Layout {
    pub nodes: Vec<LayoutNode>,
    pub links: Vec<LayoutLink>,
}

impl Layout {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.links.is_empty()
    }

    pub fn node(&self, id: &str) -> Option<&LayoutNode> {
        self.nodes.iter().find(|n| n.id == id)
    }

    pub fn nodes_of(&self, kind: NodeKind) -> impl Iterator<Item = &LayoutNode> {
        self.nodes.iter().filter(move |n| n.kind() == kind)
    }

    pub fn links_of(&self, kind: LinkKind) -> impl Iterator<Item = &LayoutLink> {
        self.links.iter().filter(move |l| l.kind == kind)
    }

    /// Secondary links drawn into one building
    pub fn building_links(&self, building_id: i64) -> Vec<&LayoutLink> {
        let prefix = format!("secondary:{}:", building_id);
        self.links
            .iter()
            .filter(|l| l.id.starts_with(&prefix))
            .collect()
    }
}

pub fn source_node_id(source: &SourceId) -> String {
    format!("source:{}", source)
}

pub fn faculty_node_id(name: &str) -> String {
    format!("faculty:{}", name)
}

pub fn building_node_id(id: i64) -> String {
    format!("building:{}", id)
}

/// Compute node positions and links from scratch.
///
/// Returns an empty layout until the viewport has been measured, or when the
/// sidebar reservation leaves no drawing width.
pub fn compute_layout(
    viewport: Viewport,
    sidebar_open: bool,
    sources: &[EnergySource],
    groups: &FacultyGroups,
    selected_building: Option<i64>,
    config: &LayoutConfig,
    palette: &SourcePalette,
) -> Layout {
    if !viewport.is_measured() {
        return Layout::default();
    }

    // Sidebar comes off before any radius or angle is derived
    let width = if sidebar_open {
        viewport.width - config.sidebar_width
    } else {
        viewport.width
    };
    if width <= 0.0 {
        return Layout::default();
    }

    let cx = width / 2.0;
    let cy = viewport.height / 2.0;
    let min_dim = width.min(viewport.height);
    let faculty_radius = config.faculty_ring_ratio * min_dim;
    let building_radius = config.building_ring_ratio * min_dim;

    let mut layout = Layout::default();

    // One node per source id, first catalog entry wins
    let sources = unique_sources(sources);

    // Source row
    let source_positions = source_row(sources.len(), cx, cy, config.source_pitch);
    for (source, &(x, y)) in sources.iter().zip(source_positions.iter()) {
        layout.nodes.push(LayoutNode {
            id: source_node_id(&source.id),
            x,
            y,
            detail: NodeDetail::Source {
                source_id: source.id.clone(),
                label: source.label.clone(),
                color: palette.color_for(&source.id),
            },
        });
    }

    let faculty_count = groups.len();
    for (index, group) in groups.values().enumerate() {
        let angle = faculty_angle(index, faculty_count, config.faculty_start_angle);
        let (fx, fy) = polar(cx, cy, faculty_radius, angle);

        layout.nodes.push(LayoutNode {
            id: faculty_node_id(&group.name),
            x: fx,
            y: fy,
            detail: NodeDetail::Faculty {
                name: group.name.clone(),
                building_count: group.buildings.len(),
                sources: group.sources.iter().cloned().collect(),
            },
        });

        for (source, &(sx, sy)) in sources.iter().zip(source_positions.iter()) {
            if !group.sources.contains(&source.id) {
                continue;
            }
            layout.links.push(LayoutLink {
                id: format!("primary:{}:{}", source.id, group.name),
                x1: sx,
                y1: sy,
                x2: fx,
                y2: fy,
                color: palette.color_for(&source.id),
                kind: LinkKind::Primary,
                active: false,
            });
        }

        let building_count = group.buildings.len();
        for (b_index, building) in group.buildings.iter().enumerate() {
            let b_angle = angle + building_arc_offset(b_index, building_count, config.building_arc);
            let (bx, by) = polar(fx, fy, building_radius, b_angle);

            let ordered = catalog_order(&building.active_sources, &sources);
            layout.nodes.push(LayoutNode {
                id: building_node_id(building.id),
                x: bx,
                y: by,
                detail: NodeDetail::Building {
                    building_id: building.id,
                    name: building.name.clone(),
                    faculty_name: group.name.clone(),
                    active_sources: ordered.clone(),
                },
            });

            let (nx, ny) = unit_normal(bx - fx, by - fy);
            let active = selected_building == Some(building.id);
            let k = ordered.len();
            for (s_index, source) in ordered.iter().enumerate() {
                let offset = parallel_offset(s_index, k, config.link_offset_step);
                layout.links.push(LayoutLink {
                    id: format!("secondary:{}:{}", building.id, source),
                    x1: fx + nx * offset,
                    y1: fy + ny * offset,
                    x2: bx + nx * offset,
                    y2: by + ny * offset,
                    color: palette.color_for(source),
                    kind: LinkKind::Secondary,
                    active,
                });
            }
        }
    }

    layout
}

/// Evenly pitched positions centered on (cx, cy)
fn source_row(count: usize, cx: f64, cy: f64, pitch: f64) -> Vec<(f64, f64)> {
    let mid = count.saturating_sub(1) as f64 / 2.0;
    (0..count)
        .map(|i| (cx + (i as f64 - mid) * pitch, cy))
        .collect()
}

fn faculty_angle(index: usize, count: usize, start: f64) -> f64 {
    index as f64 / count as f64 * TAU + start
}

/// Offset from the faculty angle; a lone building sits on the faculty angle
fn building_arc_offset(index: usize, count: usize, arc: f64) -> f64 {
    if count <= 1 {
        return 0.0;
    }
    (index as f64 / (count - 1) as f64 - 0.5) * arc
}

/// Perpendicular shift so parallel links fan out symmetrically
fn parallel_offset(index: usize, count: usize, step: f64) -> f64 {
    (index as f64 - count.saturating_sub(1) as f64 / 2.0) * step
}

fn polar(cx: f64, cy: f64, radius: f64, angle: f64) -> (f64, f64) {
    (cx + radius * angle.cos(), cy + radius * angle.sin())
}

fn unit_normal(dx: f64, dy: f64) -> (f64, f64) {
    let len = dx.hypot(dy);
    if len == 0.0 {
        return (0.0, 0.0);
    }
    (-dy / len, dx / len)
}

fn unique_sources(sources: &[EnergySource]) -> Vec<&EnergySource> {
    let mut unique: Vec<&EnergySource> = Vec::with_capacity(sources.len());
    for source in sources {
        if !unique.iter().any(|s| s.id == source.id) {
            unique.push(source);
        }
    }
    unique
}

/// Catalog sources first in catalog order, then unknown ids as reported
fn catalog_order(active: &[SourceId], catalog: &[&EnergySource]) -> Vec<SourceId> {
    let mut ordered: Vec<SourceId> = catalog
        .iter()
        .filter(|s| active.contains(&s.id))
        .map(|s| s.id.clone())
        .collect();
    ordered.extend(
        active
            .iter()
            .filter(|id| !catalog.iter().any(|s| &s.id == *id))
            .cloned(),
    );
    ordered
}
