//! Store settings (门店静态配置)

use serde::{Deserialize, Serialize};

/// Static per-store settings consumed by the report builders
///
/// Loaded once from configuration and passed explicitly; builders never
/// read global state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreSettings {
    pub store_code: String,
    pub tenant_name: String,
    /// This terminal's number
    pub terminal: u16,
    /// Ayala tenant contract number
    pub contract_number: String,
    /// Ayala company code (new requirements sheet)
    pub company_code: String,
    /// Robinson tenant code (last four characters prefix file names)
    pub robinson_tenant_code: String,
}

impl StoreSettings {
    /// Ayala terminal rendering, e.g. `001`
    pub fn ayala_terminal(&self) -> String {
        format!("{:03}", self.terminal)
    }

    /// Robinson terminal rendering, e.g. `01`
    pub fn robinson_terminal(&self) -> String {
        format!("{:02}", self.terminal)
    }
}
