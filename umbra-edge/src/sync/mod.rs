//! Accreditation sync 报表生成与投递编排
//!
//! EOD snapshot → builders (numbered by the ledger) → local artifacts →
//! remote merge → one delivery record per attempt → resend queue on failure.

mod service;

pub use service::{AccreditationService, GeneratedFile, GenerationReport};
