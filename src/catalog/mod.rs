//! The normalized model catalog data model.
//!
//! Providers describe their models in wildly different shapes; everything the
//! rest of the crate touches is one of the types defined here.

mod types;

pub use types::{
    DiscoveryResult, Freshness, ModelPricing, ModelRecord, Provider, ProviderCatalog,
};
