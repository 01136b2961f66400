//! Port traits implemented by the infrastructure layer.
//!
//! - `RemoteTask`: one asynchronous remote job whose state can be inspected
//! - `EmbeddingCompute`: the remote-sensing backend (aggregation + export)
//! - `Warehouse`: the tabular warehouse (DDL jobs, table lookup, row queries)
//! - `PlotReader`: geo file -> `PlotDataset`

pub mod compute;
pub mod plots;
pub mod task;
pub mod warehouse;
