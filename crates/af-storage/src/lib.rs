// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! af-storage: the task ledger (§4.12) — trait-backed persistence seams
//! for tasks, per-activity details, static-analysis reports, and unpack
//! results, each with a `parking_lot`-guarded in-process implementation.
//! A production deployment swaps these for database-backed
//! implementations of the same traits; the orchestrator is written
//! against the traits, never the concrete maps.

pub mod activity_store;
pub mod static_report_store;
pub mod task_store;
pub mod unpack_result_store;

pub use activity_store::{ActivityStore, InProcessActivityStore};
pub use static_report_store::{InProcessStaticReportStore, StaticReportStore};
pub use task_store::{InProcessTaskStore, TaskStore, TaskStoreError};
pub use unpack_result_store::{InProcessUnpackResultStore, UnpackResultStore};
