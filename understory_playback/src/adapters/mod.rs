// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Ready-made collaborators.
//!
//! - [`containers`]: bucket policies for the common container kinds.
//! - [`scene`]: an in-memory container tree for hosts without a live view tree.

pub mod containers;
pub mod scene;
