use crate::errors::GeoTessError;
use crate::grids::grid::Grid;
use crate::profiles::profile::Profile;

use super::metadata::ModelMetaData;

///
/// Flat numbering of every value cell of a model. Point `i` is the node
/// `nodes[i] = [vertex, layer, node]`; the reverse mapping lives in the
/// profiles themselves as their point indices.
///
/// Points are numbered vertex by vertex, then layer by layer from the
/// bottom up, then node by node. Vertices that are not part of the top
/// level of a layer's tessellation get no points in that layer.
///
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PointMap
{
    nodes: Vec<[usize; 3]>,
}

impl PointMap
{
    ///
    /// Numbers the nodes of `profiles` (indexed `[vertex][layer]`) and
    /// stores each number in its profile.
    ///
    pub(crate) fn build(grid: &Grid, metadata: &ModelMetaData, profiles: &mut [Vec<Profile>]) -> Result<Self, GeoTessError>
    {
        let connected: Vec<Vec<bool>> = (0..metadata.n_tessellations()).map(|t| grid.connected_vertices(t)).collect();
        let mut nodes = Vec::new();
        for (vertex, layers) in profiles.iter_mut().enumerate()
        {
            for (layer, profile) in layers.iter_mut().enumerate()
            {
                profile.reset_point_indices();
                if !connected[metadata.tessellation(layer)][vertex]
                {
                    continue;
                }
                for node in 0..profile.n_values()
                {
                    profile.set_point_index(node, Some(nodes.len()))?;
                    nodes.push([vertex, layer, node]);
                }
            }
        }
        tracing::debug!(points = nodes.len(), "point map built");
        Ok(Self { nodes })
    }

    #[inline]
    pub fn len(&self) -> usize
    {
        self.nodes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool
    {
        self.nodes.is_empty()
    }

    /// `[vertex, layer, node]` of `point`.
    pub fn point(&self, point: usize) -> Result<[usize; 3], GeoTessError>
    {
        self.nodes.get(point).copied().ok_or(GeoTessError::InvalidIndex { index: point, len: self.nodes.len() })
    }

    pub fn vertex_index(&self, point: usize) -> Result<usize, GeoTessError>
    {
        Ok(self.point(point)?[0])
    }

    pub fn layer_index(&self, point: usize) -> Result<usize, GeoTessError>
    {
        Ok(self.point(point)?[1])
    }

    pub fn node_index(&self, point: usize) -> Result<usize, GeoTessError>
    {
        Ok(self.point(point)?[2])
    }

    pub fn iter(&self) -> std::slice::Iter<'_, [usize; 3]>
    {
        self.nodes.iter()
    }
}
