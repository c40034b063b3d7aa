use meso_core::VehicleId;
use meso_net::NetError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SegmentError {
    /// Raised by `initialise` when route checking is enabled and the vehicle
    /// departed with a route the network does not connect.
    #[error("vehicle {0} has no valid route")]
    InvalidRoute(VehicleId),

    #[error(transparent)]
    Net(#[from] NetError),
}

pub type SegmentResult<T> = Result<T, SegmentError>;
