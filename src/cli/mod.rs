//! Terminal front-end for the build.

pub mod build;
pub mod country;
pub mod setup;
pub mod summary;
pub mod ui;
