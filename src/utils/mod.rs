//! Small shared helpers (URL/domain handling).

pub(crate) mod domain;
