//! Integrated content-mapping API

pub mod request;
pub mod xml;

pub use request::Integrated;
pub use xml::MappingResult;
