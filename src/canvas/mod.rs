pub(crate) mod block;
pub(crate) mod items;
pub(crate) mod layers;
pub(crate) mod placement;
pub(crate) mod registry;
pub(crate) mod visibility;
