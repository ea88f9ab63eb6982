// src/extractors/mod.rs
pub mod assembler;
pub mod disambiguator;
pub mod document;
pub mod fields;
pub mod patterns;
pub mod reference;

// Re-export key extraction types for convenience
pub use assembler::CourseAssembler;
pub use document::CoursePage;
pub use reference::ReferenceCache;
