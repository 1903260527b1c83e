use serde::{Deserialize, Serialize};

/// Identity of the application making a request.
///
/// The host authenticates the caller; the store only trusts these two facts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Caller {
    /// Owning application identifier stamped on every row this caller writes
    pub package_name: String,
    /// Broad-access grant: lifts owner scoping for channels and programs
    pub full_epg_access: bool,
}

impl Caller {
    pub fn new(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            full_epg_access: false,
        }
    }

    pub fn with_full_access(package_name: impl Into<String>) -> Self {
        Self {
            package_name: package_name.into(),
            full_epg_access: true,
        }
    }
}
