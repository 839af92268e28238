//! Traversal over schema-described objects: layout arithmetic, size
//! calculation, the scanning engines, and single-field lookup.

pub mod layout;
pub mod lookup;
pub mod scan;
pub mod size;
