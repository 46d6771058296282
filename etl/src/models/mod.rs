mod source;
mod warehouse;

pub use source::{SourceCourier, SourceOrderLine, SourceProduct, SourceRider, SourceUser};
pub use warehouse::{DimDate, DimProduct, DimRider, DimUser, FactOrderItem, Gender};
