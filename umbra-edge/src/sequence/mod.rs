//! 序号分配 - 每小时交易号区间与每日批次号
//!
//! ```text
//! SequenceAllocator
//!   ├── allocate_hour_range   (date, hour) → [start, end], lazily, never renumbered
//!   ├── rebuild_all_ledger    destructive repair from transaction history
//!   └── allocate_batch_number (store, date) → batch, committed after generation
//! ```

mod allocator;

pub use allocator::{SequenceAllocator, next_range, rebuild_ranges};
