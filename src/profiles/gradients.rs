use parking_lot::RwLock;

use crate::errors::GeoTessError;
use crate::utilities::vector::Vector3;

#[derive(Clone, Debug)]
struct AttributeGradients
{
    reciprocal: bool,
    /// One gradient per profile node.
    nodes: Vec<Vector3>,
}

///
/// Lazily computed per-attribute, per-node gradients of one profile. The
/// lock is the profile's critical section: at most one thread fills a given
/// profile and later readers see the completed entries.
///
#[derive(Debug, Default)]
pub(crate) struct GradientCache
{
    attributes: RwLock<Vec<Option<AttributeGradients>>>,
}

impl Clone for GradientCache
{
    fn clone(&self) -> Self
    {
        Self { attributes: RwLock::new(self.attributes.read().clone()) }
    }
}

impl GradientCache
{
    pub(crate) fn is_set(&self, attribute: usize) -> bool
    {
        matches!(self.attributes.read().get(attribute), Some(Some(_)))
    }

    pub(crate) fn reciprocal(&self, attribute: usize) -> Option<bool>
    {
        self.attributes.read().get(attribute).and_then(|g| g.as_ref()).map(|g| g.reciprocal)
    }

    pub(crate) fn node(&self, attribute: usize, node: usize) -> Option<Vector3>
    {
        self.attributes.read().get(attribute).and_then(|g| g.as_ref()).and_then(|g| g.nodes.get(node).copied())
    }

    ///
    /// Runs `f` on the node gradients of `attribute`, if computed.
    ///
    pub(crate) fn with_nodes<R, F: FnOnce(&[Vector3]) -> R>(&self, attribute: usize, f: F) -> Option<R>
    {
        let guard = self.attributes.read();
        guard.get(attribute).and_then(|g| g.as_ref()).map(|g| f(&g.nodes))
    }

    ///
    /// Makes sure gradients of `attribute` exist with the requested
    /// reciprocal flag, computing one gradient per entry of `radii` with
    /// `estimate` otherwise.
    ///
    pub(crate) fn ensure<F>(&self, attribute: usize, reciprocal: bool, radii: &[f64], mut estimate: F) -> Result<(), GeoTessError>
        where F: FnMut(f64) -> Result<Vector3, GeoTessError>
    {
        if self.reciprocal(attribute) == Some(reciprocal)
        {
            return Ok(());
        }
        let mut guard = self.attributes.write();
        // another thread may have finished while we waited
        if let Some(Some(g)) = guard.get(attribute)
        {
            if g.reciprocal == reciprocal
            {
                return Ok(());
            }
        }
        let mut nodes = Vec::with_capacity(radii.len());
        for r in radii
        {
            nodes.push(estimate(*r)?);
        }
        if guard.len() <= attribute
        {
            guard.resize(attribute + 1, None);
        }
        guard[attribute] = Some(AttributeGradients { reciprocal, nodes });
        tracing::debug!(attribute, reciprocal, nodes = radii.len(), "profile gradients computed");
        Ok(())
    }

    pub(crate) fn clear(&self)
    {
        self.attributes.write().clear();
    }
}

#[test]
fn check_gradient_cache()
{
    let cache = GradientCache::default();
    assert!(!cache.is_set(0));
    let mut calls = 0;
    cache.ensure(1, false, &[10.0, 20.0], |r| { calls += 1; Ok([r, 0.0, 0.0]) }).unwrap();
    assert_eq!(calls, 2);
    assert!(cache.is_set(1));
    assert!(!cache.is_set(0));
    assert_eq!(cache.node(1, 1), Some([20.0, 0.0, 0.0]));
    assert_eq!(cache.reciprocal(1), Some(false));

    // cached, no recomputation
    cache.ensure(1, false, &[10.0, 20.0], |_| panic!("recomputed")).unwrap();
    // reciprocal flag differs, recomputed
    cache.ensure(1, true, &[10.0, 20.0], |r| Ok([0.0, r, 0.0])).unwrap();
    assert_eq!(cache.node(1, 0), Some([0.0, 10.0, 0.0]));

    let copy = cache.clone();
    cache.clear();
    assert!(!cache.is_set(1));
    assert!(copy.is_set(1));
}
