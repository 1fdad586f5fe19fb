pub mod classify;
pub mod cli;
pub mod models;
pub mod seed;
pub mod startup;
pub mod store;
