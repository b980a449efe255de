pub(crate) mod debounce;
pub(crate) mod hydrate;
pub(crate) mod kv;
pub(crate) mod snapshot;
