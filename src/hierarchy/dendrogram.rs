//! Built-in dendrogram: structures grown from the brightest pixels down,
//! joined into branches where independent structures meet.
use log::debug;

use super::backend::{Connectivity, DendroParams, Hierarchy, HierarchyBackend};
use crate::error::{Result, StatError};
use crate::field::FieldData;

#[derive(Clone, Debug)]
struct Structure {
    pixels: Vec<usize>,
    vmax: f64,
    vmin: f64,
    parent: Option<usize>,
    children: Vec<usize>,
    /// Value at which the children joined. Meaningless for leaves.
    merge_level: f64,
    merged_into: Option<usize>,
    alive: bool,
}

impl Structure {
    fn empty() -> Self {
        Self {
            pixels: Vec::new(),
            vmax: f64::NEG_INFINITY,
            vmin: f64::INFINITY,
            parent: None,
            children: Vec::new(),
            merge_level: f64::NAN,
            merged_into: None,
            alive: true,
        }
    }

    fn add_pixel(&mut self, pixel: usize, value: f64) {
        self.pixels.push(pixel);
        self.vmax = self.vmax.max(value);
        self.vmin = self.vmin.min(value);
    }

    fn is_leaf(&self) -> bool {
        self.children.is_empty()
    }

    fn npix(&self) -> usize {
        self.pixels.len()
    }
}

/// Dendrogram over an n-dimensional field stored row-major.
#[derive(Clone, Debug)]
pub struct Dendrogram {
    shape: Vec<usize>,
    strides: Vec<usize>,
    periodic: Vec<bool>,
    params: DendroParams,
    structures: Vec<Structure>,
}

impl Dendrogram {
    pub fn compute(
        data: &[f64],
        shape: &[usize],
        params: &DendroParams,
        connectivity: &Connectivity,
    ) -> Result<Self> {
        let n: usize = shape.iter().product();
        if shape.is_empty() || n != data.len() {
            return Err(StatError::ShapeMismatch {
                expected: shape.to_vec(),
                found: vec![data.len()],
            });
        }
        if let Some(&axis) = connectivity.periodic_axes.iter().find(|&&a| a >= shape.len()) {
            return Err(StatError::invalid(
                "periodic_axes",
                format!("axis {axis} out of range for {}-d data", shape.len()),
            ));
        }
        if !(params.min_delta >= 0.0) {
            return Err(StatError::invalid("min_delta", "must be non-negative"));
        }

        let mut strides = vec![1; shape.len()];
        for d in (0..shape.len().saturating_sub(1)).rev() {
            strides[d] = strides[d + 1] * shape[d + 1];
        }
        let periodic = (0..shape.len())
            .map(|d| connectivity.periodic_axes.contains(&d))
            .collect();
        let mut dendro = Self {
            shape: shape.to_vec(),
            strides,
            periodic,
            params: params.clone(),
            structures: Vec::new(),
        };

        let mut order: Vec<usize> = (0..n)
            .filter(|&i| data[i].is_finite() && data[i] >= params.min_value)
            .collect();
        order.sort_by(|&a, &b| data[b].total_cmp(&data[a]).then(a.cmp(&b)));

        let mut owner: Vec<Option<usize>> = vec![None; n];
        let mut neighbours = Vec::with_capacity(2 * shape.len());
        let mut adjacent = Vec::new();
        for &pixel in &order {
            let value = data[pixel];
            dendro.neighbours(pixel, &mut neighbours);
            adjacent.clear();
            for &nb in &neighbours {
                if let Some(id) = owner[nb] {
                    let root = dendro.root(id);
                    if !adjacent.contains(&root) {
                        adjacent.push(root);
                    }
                }
            }
            let target = match adjacent.len() {
                0 => dendro.push(Structure::empty()),
                1 => adjacent[0],
                _ => dendro.join(&adjacent, value),
            };
            dendro.structures[target].add_pixel(pixel, value);
            owner[pixel] = Some(target);
        }
        dendro.remove_failing_trunk_leaves(params.min_delta);

        debug!(
            "dendrogram: {} pixels above {} -> {} structures",
            order.len(),
            params.min_value,
            dendro.len()
        );
        Ok(dendro)
    }

    pub fn params(&self) -> &DendroParams {
        &self.params
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Number of live leaves.
    pub fn num_leaves(&self) -> usize {
        self.live().filter(|s| s.is_leaf()).count()
    }

    fn live(&self) -> impl Iterator<Item = &Structure> {
        self.structures.iter().filter(|s| s.alive)
    }

    fn push(&mut self, structure: Structure) -> usize {
        self.structures.push(structure);
        self.structures.len() - 1
    }

    fn neighbours(&self, pixel: usize, out: &mut Vec<usize>) {
        out.clear();
        for d in 0..self.shape.len() {
            let (size, stride) = (self.shape[d], self.strides[d]);
            let coord = (pixel / stride) % size;
            let wrap = self.periodic[d] && size > 1;
            if coord > 0 {
                out.push(pixel - stride);
            } else if wrap {
                out.push(pixel + (size - 1) * stride);
            }
            if coord + 1 < size {
                out.push(pixel + stride);
            } else if wrap {
                out.push(pixel - (size - 1) * stride);
            }
        }
    }

    /// Follow merge forwarding, then parents, to the top-level ancestor.
    fn root(&self, mut id: usize) -> usize {
        while let Some(next) = self.structures[id].merged_into {
            id = next;
        }
        while let Some(parent) = self.structures[id].parent {
            id = parent;
        }
        id
    }

    fn independent_at(&self, id: usize, level: f64, min_delta: f64) -> bool {
        let s = &self.structures[id];
        s.npix() >= self.params.min_npix && s.vmax - level >= min_delta
    }

    /// Resolve a pixel touching several structures; returns the structure
    /// that receives it.
    fn join(&mut self, adjacent: &[usize], value: f64) -> usize {
        let min_delta = self.params.min_delta;
        let (weak, independent): (Vec<usize>, Vec<usize>) = adjacent
            .iter()
            .partition(|&&id| {
                self.structures[id].is_leaf() && !self.independent_at(id, value, min_delta)
            });

        match independent.len() {
            0 => {
                let survivor = weak
                    .iter()
                    .copied()
                    .reduce(|best, id| {
                        if self.structures[id].vmax > self.structures[best].vmax {
                            id
                        } else {
                            best
                        }
                    })
                    .unwrap_or(adjacent[0]);
                for &id in weak.iter().filter(|&&id| id != survivor) {
                    self.merge(id, survivor);
                }
                survivor
            }
            1 => {
                for &id in &weak {
                    self.merge(id, independent[0]);
                }
                independent[0]
            }
            _ => {
                let mut branch = Structure::empty();
                branch.merge_level = value;
                branch.children = independent.clone();
                let branch = self.push(branch);
                for &child in &independent {
                    self.structures[child].parent = Some(branch);
                }
                for &id in &weak {
                    self.merge(id, branch);
                }
                branch
            }
        }
    }

    /// Move the pixels of `src` into `dst` and retire `src`.
    fn merge(&mut self, src: usize, dst: usize) {
        let pixels = std::mem::take(&mut self.structures[src].pixels);
        let (vmax, vmin) = (self.structures[src].vmax, self.structures[src].vmin);
        let target = &mut self.structures[dst];
        target.pixels.extend(pixels);
        target.vmax = target.vmax.max(vmax);
        target.vmin = target.vmin.min(vmin);
        let retired = &mut self.structures[src];
        retired.alive = false;
        retired.merged_into = Some(dst);
    }

    fn remove_failing_trunk_leaves(&mut self, min_delta: f64) -> bool {
        let min_npix = self.params.min_npix;
        let mut removed = false;
        for s in self.structures.iter_mut() {
            if s.alive
                && s.parent.is_none()
                && s.is_leaf()
                && (s.npix() < min_npix || s.vmax - s.vmin < min_delta)
            {
                s.alive = false;
                removed = true;
            }
        }
        removed
    }

    fn merge_weak_leaves(&mut self, min_delta: f64) -> bool {
        let mut changed = false;
        for id in 0..self.structures.len() {
            let s = &self.structures[id];
            let Some(parent) = s.parent else { continue };
            if !s.alive || !s.is_leaf() {
                continue;
            }
            let level = self.structures[parent].merge_level;
            if !self.independent_at(id, level, min_delta) {
                self.structures[parent].children.retain(|&c| c != id);
                self.structures[id].parent = None;
                self.merge(id, parent);
                changed = true;
            }
        }
        changed
    }

    /// A branch left with a single child takes over the child's pixels,
    /// children and merge level.
    fn collapse_single_child_branches(&mut self) -> bool {
        let mut changed = false;
        for id in 0..self.structures.len() {
            if !self.structures[id].alive || self.structures[id].children.len() != 1 {
                continue;
            }
            let child = self.structures[id].children[0];
            let grandchildren = std::mem::take(&mut self.structures[child].children);
            let child_level = self.structures[child].merge_level;
            for &gc in &grandchildren {
                self.structures[gc].parent = Some(id);
            }
            self.structures[child].parent = None;
            self.merge(child, id);
            let branch = &mut self.structures[id];
            branch.children = grandchildren;
            branch.merge_level = child_level;
            changed = true;
        }
        changed
    }
}

impl Hierarchy for Dendrogram {
    fn len(&self) -> usize {
        self.live().count()
    }

    fn peak_values(&self) -> Vec<f64> {
        self.live().map(|s| s.vmax).collect()
    }

    fn prune(&mut self, min_delta: f64) {
        let before = self.len();
        loop {
            let merged = self.merge_weak_leaves(min_delta);
            let collapsed = self.collapse_single_child_branches();
            let removed = self.remove_failing_trunk_leaves(min_delta);
            if !(merged || collapsed || removed) {
                break;
            }
        }
        self.params.min_delta = min_delta;
        debug!("dendrogram prune to {min_delta}: {before} -> {} structures", self.len());
    }
}

/// [`HierarchyBackend`] producing [`Dendrogram`]s.
#[derive(Clone, Copy, Debug, Default)]
pub struct DendrogramBackend;

impl HierarchyBackend for DendrogramBackend {
    fn build(
        &self,
        data: &FieldData,
        params: &DendroParams,
        connectivity: &Connectivity,
    ) -> Result<Box<dyn Hierarchy>> {
        let dendro = Dendrogram::compute(data.values(), &data.shape(), params, connectivity)?;
        Ok(Box::new(dendro))
    }
}
