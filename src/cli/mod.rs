pub mod fetch;
pub mod query;
pub mod serve;
pub mod setup;
pub mod ui;
