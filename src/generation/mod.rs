pub(crate) mod request;
pub(crate) mod service;
pub(crate) mod tracker;
pub(crate) mod validate;
