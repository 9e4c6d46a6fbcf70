//! Resend 重发队列
//!
//! ```text
//!  DeliveryRecord(sent=false) ──► trigger()
//!                                    │  单实例标志 + 数据库租约
//!                                    ▼
//!                 Idle ──► Draining ──► Empty | PartialFailure ──► Idle
//!                              ▲                    │ retry delay
//!                              └────────────────────┘
//! ```
//!
//! One drain worker per datastore: the in-process flag stops a second
//! worker in this process, the redb lease stops a second process.

mod coordinator;
mod worker;

pub use coordinator::{DRAIN_LEASE, DrainSettings, ResendCoordinator};
