// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The local/dev Runner Provider: a `tokio::process::Command`-driven
//! backend satisfying `centaurx_core::runner`'s contract without a real
//! container runtime, which is explicitly out of scope for the core
//! (spec §1). Production deployments are expected to supply their own
//! container-backed `RunnerProvider`; this one exists so the binary is
//! runnable standalone and so integration tests have something real to
//! exercise.

pub mod process;

pub use process::{ProcessRunner, ProcessRunnerProvider};
