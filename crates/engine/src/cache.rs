//! Read-through cache invalidation seam.

use std::sync::Arc;

use stockbook_core::ProductId;

/// Cache invalidation keyed by exact product id.
///
/// The engine never reads through this interface; it only tells the cache
/// which product's derived views are stale after a mutation. Failures are
/// not representable: an invalidation that goes missing degrades to a stale
/// read, which callers of a read-through cache already tolerate.
pub trait ReadCache: Send + Sync {
    fn invalidate(&self, product_id: ProductId);
}

impl<C> ReadCache for Arc<C>
where
    C: ReadCache + ?Sized,
{
    fn invalidate(&self, product_id: ProductId) {
        (**self).invalidate(product_id)
    }
}

/// Default cache for deployments without a read-through layer.
#[derive(Debug, Default)]
pub struct NoopCache;

impl ReadCache for NoopCache {
    fn invalidate(&self, _product_id: ProductId) {}
}
