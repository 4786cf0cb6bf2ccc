// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Prelude

#![allow(unknown_lints)]
#![allow(ambiguous_glob_reexports)]
#![doc(hidden)]

pub use nostrkit::prelude::*;

pub use crate::cache::*;
pub use crate::pool::{self, *};
pub use crate::relay::{self, *};
pub use crate::subscriptions::*;
pub use crate::transport;
