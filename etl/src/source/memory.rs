use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use common::{Error, Result};
use futures::StreamExt;
use futures::stream;

use crate::models::{SourceCourier, SourceOrderLine, SourceProduct, SourceRider, SourceUser};
use crate::source::schema::{contract_columns, missing_columns};
use crate::source::{ChunkStream, SourceStore};

/// Substitute source store holding rows in memory.
#[derive(Debug, Default)]
pub struct MemorySource {
    couriers: Vec<SourceCourier>,
    riders: Vec<SourceRider>,
    products: Vec<SourceProduct>,
    users: Vec<SourceUser>,
    order_lines: Vec<SourceOrderLine>,
    columns: Option<HashMap<String, HashSet<String>>>,
    unreachable: bool,
    closed: AtomicBool,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_couriers(mut self, couriers: Vec<SourceCourier>) -> Self {
        self.couriers = couriers;
        self
    }

    pub fn with_riders(mut self, riders: Vec<SourceRider>) -> Self {
        self.riders = riders;
        self
    }

    pub fn with_products(mut self, products: Vec<SourceProduct>) -> Self {
        self.products = products;
        self
    }

    pub fn with_users(mut self, users: Vec<SourceUser>) -> Self {
        self.users = users;
        self
    }

    /// Lines are served in `(order id, product id)` order, like the join query.
    pub fn with_order_lines(mut self, mut lines: Vec<SourceOrderLine>) -> Self {
        lines.sort_by_key(|l| (l.order_id, l.product_id));
        self.order_lines = lines;
        self
    }

    /// Pretends `table.column` does not exist in the source schema.
    pub fn without_column(mut self, table: &str, column: &str) -> Self {
        let mut columns = self.columns.take().unwrap_or_else(contract_columns);
        if let Some(present) = columns.get_mut(table) {
            present.remove(column);
        }
        self.columns = Some(columns);
        self
    }

    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

fn chunks_of<T: Clone + Send + Sync + 'static>(rows: &[T], batch_size: usize) -> ChunkStream<'_, T> {
    let chunks: Vec<Result<Vec<T>>> = rows
        .chunks(batch_size.max(1))
        .map(|chunk| Ok(chunk.to_vec()))
        .collect();
    stream::iter(chunks).boxed()
}

#[async_trait]
impl SourceStore for MemorySource {
    async fn ping(&self) -> Result<()> {
        if self.unreachable {
            return Err(Error::Connectivity(
                "source database unreachable: connection refused".into(),
            ));
        }
        Ok(())
    }

    async fn verify_schema(&self) -> Result<()> {
        let Some(columns) = &self.columns else {
            return Ok(());
        };
        let missing = missing_columns(columns);
        if missing.is_empty() {
            Ok(())
        } else {
            Err(Error::SchemaMismatch(format!(
                "source is missing {}",
                missing.join(", ")
            )))
        }
    }

    async fn couriers(&self) -> Result<Vec<SourceCourier>> {
        Ok(self.couriers.clone())
    }

    fn riders(&self, batch_size: usize) -> ChunkStream<'_, SourceRider> {
        chunks_of(&self.riders, batch_size)
    }

    fn products(&self, batch_size: usize) -> ChunkStream<'_, SourceProduct> {
        chunks_of(&self.products, batch_size)
    }

    fn users(&self, batch_size: usize) -> ChunkStream<'_, SourceUser> {
        chunks_of(&self.users, batch_size)
    }

    fn order_lines(&self, batch_size: usize) -> ChunkStream<'_, SourceOrderLine> {
        chunks_of(&self.order_lines, batch_size)
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::TryStreamExt;

    fn line(order_id: i32, product_id: i32) -> SourceOrderLine {
        SourceOrderLine {
            order_id: Some(order_id),
            order_number: Some(format!("ORD-{}", order_id)),
            user_id: Some(1),
            rider_id: None,
            delivery_date: Some("2025-06-01".into()),
            product_id: Some(product_id),
            quantity: Some(1),
            notes: None,
        }
    }

    #[tokio::test]
    async fn order_lines_stream_sorted_in_bounded_chunks() {
        let source = MemorySource::new().with_order_lines(vec![line(2, 1), line(1, 9), line(1, 3)]);

        let chunks: Vec<Vec<SourceOrderLine>> = source.order_lines(2).try_collect().await.unwrap();
        assert_eq!(chunks.len(), 2);
        assert_eq!(chunks[0].len(), 2);
        assert_eq!(chunks[0][0].product_id, Some(3));
        assert_eq!(chunks[1][0].order_id, Some(2));
    }

    #[tokio::test]
    async fn schema_gaps_are_reported() {
        let source = MemorySource::new().without_column("Orders", "deliveryDate");
        let err = source.verify_schema().await.unwrap_err();
        assert!(err.to_string().contains("Orders.deliveryDate"));
        assert!(err.is_fatal());
    }
}
