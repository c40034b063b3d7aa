use meso_core::{CoreError, EdgeId, VehicleId};
use meso_net::NetError;
use meso_segment::SegmentError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimError {
    #[error(transparent)]
    Config(#[from] CoreError),

    #[error(transparent)]
    Net(#[from] NetError),

    #[error(transparent)]
    Segment(#[from] SegmentError),

    #[error("vehicle {1} departs on edge {0} which has no segments")]
    UnknownDepartEdge(EdgeId, VehicleId),
}

pub type SimResult<T> = Result<T, SimError>;
