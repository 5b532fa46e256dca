pub(crate) mod data_source;
