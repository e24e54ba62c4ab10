//! Network side of the node: keeping the Wi-Fi link up and pushing reports.

pub mod connectivity;
pub mod reporter;

pub use connectivity::{ConnectivityMonitor, ConnectivityState, Transition};
pub use reporter::{ReportStatus, Reporter};
