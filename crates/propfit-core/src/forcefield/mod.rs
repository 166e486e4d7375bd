//! SMIRNOFF force-field documents and the preprocessing applied before a fit.
//!
//! The document model deliberately stays at the XML level: sections and
//! parameters are ordered lists of attributes, never interpreted physical
//! quantities, so a read-edit-write cycle preserves everything it does not
//! explicitly touch.

pub mod document;
pub mod edit;
pub mod smirks;
