//! Third-party link-unlocking integrations. Kept out of the core `engine`
//! crate so its HTTP/JSON dependency footprint only applies when a user
//! actually opts into a debrid service (SPEC_FULL §4.6).

mod alldebrid;

pub use alldebrid::AllDebridPreprocessor;
