pub mod epg_cleanup;

pub use epg_cleanup::{CleanupReport, EpgDataCleanup};
