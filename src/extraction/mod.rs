pub(crate) mod error;
pub(crate) mod extractor;
pub(crate) mod holiday;
pub(crate) mod retry;
