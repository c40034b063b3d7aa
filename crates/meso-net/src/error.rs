use meso_core::{EdgeId, LaneId, LinkId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetError {
    #[error("edge {0} does not exist")]
    UnknownEdge(EdgeId),

    #[error("lane {0} does not exist")]
    UnknownLane(LaneId),

    #[error("link {0} does not exist")]
    UnknownLink(LinkId),

    #[error("no lane of edge {edge} is allowed to reach successor {to}")]
    NoAllowedLanes { edge: EdgeId, to: EdgeId },
}

pub type NetResult<T> = Result<T, NetError>;
