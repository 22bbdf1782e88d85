use thiserror::Error;

use crate::model::NodeId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Road graph is not loaded yet")]
    GraphNotLoaded,
    #[error("Node {0} is not present in the road graph")]
    UnknownNode(NodeId),
    #[error("Route query was cancelled")]
    Cancelled,
    #[error("Invalid data: {0}")]
    InvalidData(String),
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}
