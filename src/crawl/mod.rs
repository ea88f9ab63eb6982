// src/crawl/mod.rs

//! The crawling collaborator: fetches reference, listing and course pages
//! and hands parsed documents to the extraction engine.

pub mod client;
pub mod listing;
pub mod models;
pub mod runner;
