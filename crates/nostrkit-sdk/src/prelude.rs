// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Prelude

#![allow(unknown_lints)]
#![allow(ambiguous_glob_reexports)]
#![doc(hidden)]

pub use nostrkit::prelude::*;
pub use nostrkit_connect::NostrConnect;
pub use nostrkit_outbox::*;
pub use nostrkit_relay_pool::prelude::*;

pub use crate::client::*;
pub use crate::session::*;
pub use crate::signer::*;
pub use crate::store::*;
