pub mod address;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod finance;
pub mod harvest;
pub mod models;
pub mod portfolio;
pub mod reconcile;
pub mod storage;
pub mod tracker;
