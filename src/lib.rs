pub mod controller;
pub mod core;
pub mod lookup;

// --- Primary exports ---
pub use crate::controller::{
    classify, normalize, scan_channel, ControllerSettings, Requery, SearchController,
    SearchHandle, ScanReceiver, ScanSender, SubscriptionId,
};
pub use crate::core::config::{load_config, FolioConfig};
pub use crate::core::types::*;
pub use crate::core::{ErrorKind, LookupError, SearchState};
pub use crate::lookup::{GoogleBooksService, SearchService};
