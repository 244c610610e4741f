//! Data models for parsed requests.
//!
//! This module contains the core data structures produced by the parser and
//! consumed by the variable resolver.

pub mod request;

pub use request::{
    HttpMethod, ParsedRequest, ParsedRequestFile, RawRequest, RequestBody, VariableMap,
    VariableReference,
};
