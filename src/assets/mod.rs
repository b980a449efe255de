pub(crate) mod dir_store;
pub(crate) mod media;
pub(crate) mod store;
