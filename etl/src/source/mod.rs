pub mod memory;
pub mod postgres;
pub mod schema;

use async_trait::async_trait;
use common::Result;
use futures::stream::BoxStream;

use crate::models::{SourceCourier, SourceOrderLine, SourceProduct, SourceRider, SourceUser};

pub use memory::MemorySource;
pub use postgres::PgSource;

/// Bounded chunks pulled one at a time from a server-side cursor.
pub type ChunkStream<'a, T> = BoxStream<'a, Result<Vec<T>>>;

/// Read-only view of the transactional store.
#[async_trait]
pub trait SourceStore: Send + Sync {
    async fn ping(&self) -> Result<()>;

    /// Fails with `Error::SchemaMismatch` naming every missing table or column.
    async fn verify_schema(&self) -> Result<()>;

    /// Couriers are small enough to load whole.
    async fn couriers(&self) -> Result<Vec<SourceCourier>>;

    fn riders(&self, batch_size: usize) -> ChunkStream<'_, SourceRider>;

    fn products(&self, batch_size: usize) -> ChunkStream<'_, SourceProduct>;

    fn users(&self, batch_size: usize) -> ChunkStream<'_, SourceUser>;

    /// Orders joined with their items, ordered by order id then product id.
    fn order_lines(&self, batch_size: usize) -> ChunkStream<'_, SourceOrderLine>;

    async fn close(&self);
}
