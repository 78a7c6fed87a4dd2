use crate::topology::Connection;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum NetworkError {
    /// A push or pop targeted a connection the bus never registered —
    /// a wiring bug in the driver, not a runtime condition.
    #[error("connection not registered on the bus: {0}")]
    UnknownConnection(Connection),
}
