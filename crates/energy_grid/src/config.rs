/// Edge length of one spatial-index cell in world units.
pub const DEFAULT_CELL_SIZE: f32 = 16.0;

/// Minimum planar displacement (world units) before a moved producer or
/// consumer invalidates the current allocation. Compared squared.
pub const DEFAULT_MOVEMENT_THRESHOLD: f32 = 0.1;

/// Upper bound on the cell size accepted by `GridParams::validate`.
pub const MAX_CELL_SIZE: f32 = 4096.0;

/// Most cells one producer may paint. Producers whose bounding square spans
/// more (including infinite radii) are kept on a grid-wide candidate list
/// instead.
pub const MAX_PAINTED_CELLS: i64 = 4096;
