pub(crate) mod lut;
pub(crate) mod migrate;
pub(crate) mod model;
pub(crate) mod normalize;
pub(crate) mod presets;
pub(crate) mod resolve;
