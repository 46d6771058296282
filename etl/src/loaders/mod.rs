pub mod dates;
pub mod dimension;
pub mod facts;
pub mod products;
pub mod riders;
pub mod users;

use async_trait::async_trait;
use common::Result;

use crate::EtlOptions;
use crate::report::LoadReport;
use crate::source::SourceStore;
use crate::warehouse::Warehouse;

pub use dates::load_dates;
pub use facts::FactsStep;
pub use products::ProductsStep;
pub use riders::RidersStep;
pub use users::UsersStep;

/// Handles a step borrows for the duration of one run.
pub struct StepContext<'a> {
    pub source: &'a dyn SourceStore,
    pub warehouse: &'a dyn Warehouse,
    pub options: &'a EtlOptions,
}

/// One named unit of work in a run.
#[async_trait]
pub trait EtlStep: Send + Sync {
    fn name(&self) -> &'static str;

    async fn run(&self, ctx: &StepContext<'_>) -> Result<LoadReport>;
}
