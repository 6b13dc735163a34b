use thiserror::Error;

/// Crate-wide result type.
pub type Result<T> = std::result::Result<T, SolverError>;

/// Errors raised while building or advancing a case.
#[derive(Error, Debug)]
pub enum SolverError {
    /// A fixed-wall cell borders more than two fluid cells.
    #[error(
        "boundary cell at i = {i}, j = {j} has {count} fluid neighbours (at most two allowed); fix the geometry"
    )]
    MalformedBoundary { i: usize, j: usize, count: usize },

    #[error("{kind} cell at i = {i}, j = {j} borders fluid on a side it cannot handle")]
    UnsupportedBorder { kind: &'static str, i: usize, j: usize },

    #[error("fluid cell at i = {i}, j = {j} lies on the outer ring of the domain")]
    FluidOnDomainBoundary { i: usize, j: usize },

    #[error("geometry is {found_width}x{found_height} cells, expected {expected_width}x{expected_height}")]
    GeometrySize {
        expected_width: usize,
        expected_height: usize,
        found_width: usize,
        found_height: usize,
    },

    #[error("malformed geometry: {0}")]
    Geometry(String),

    #[error("non-finite velocity at i = {i}, j = {j}; the run has diverged")]
    Diverged { i: usize, j: usize },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Yaml(#[from] serde_yaml::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}
