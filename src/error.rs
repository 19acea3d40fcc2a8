use std::path::PathBuf;

use derive_more::Display;

pub type Result<T> = core::result::Result<T, SurfacePlotError>;

#[derive(Debug, Display)]
pub enum SurfacePlotError {
    /// The gradient table was queried before [`build`](crate::gradient::GradientTable::build).
    #[display("gradient table has not been built")]
    GradientNotBuilt,

    /// A colour query was made against a grid with no samples, so no value range exists.
    #[display("value range is undefined for an empty grid")]
    EmptyGrid,

    #[display("unknown function: {_0}")]
    UnknownFunction(String),

    #[display("unknown point cloud: {_0}")]
    UnknownPointCloud(String),

    /// Grid spacing must be finite and strictly positive.
    #[display("invalid grid resolution: {_0}")]
    InvalidResolution(f64),

    #[display("parameter `{_0}` must be finite")]
    NonFiniteParameter(&'static str),

    /// A point-cloud file could not be opened or read.
    #[display("failed to load point cloud {}: {source}", path.display())]
    Load {
        path: PathBuf,
        source: std::io::Error,
    },
}

impl std::error::Error for SurfacePlotError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SurfacePlotError::Load { source, .. } => Some(source),
            _ => None,
        }
    }
}
