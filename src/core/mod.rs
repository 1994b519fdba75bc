//! Core business logic: the domain model, redenomination and price reconstruction

pub mod config;
pub mod engine;
pub mod error;
pub mod log;
pub mod market;
pub mod model;
pub mod pipeline;
pub mod redenomination;

// Re-export main types for cleaner imports
pub use error::BuildError;
pub use market::{ExchangeRates, MarketData, StorePrices};
pub use model::{
    Country, InflationKind, InflationSeries, PricePoint, StoreOfValue, ThingPriceSeries,
};
pub use pipeline::{CountryFailure, Dataset, KindReport};
