// Copyright (c) 2024-2025 nostrkit developers
// Distributed under the MIT software license

//! Prelude

#![allow(unknown_lints)]
#![allow(ambiguous_glob_reexports)]
#![doc(hidden)]

pub use crate::event::builder::*;
pub use crate::event::id::*;
pub use crate::event::kind::*;
pub use crate::event::tag::*;
pub use crate::event::unsigned::*;
pub use crate::event::{self, *};
pub use crate::filter::{self, *};
pub use crate::key::{self, *};
pub use crate::message::*;
pub use crate::nips::nip02::{self, *};
pub use crate::nips::nip42;
pub use crate::nips::nip44;
pub use crate::nips::nip46::{self, NostrConnectURI};
pub use crate::nips::nip51::{self, *};
pub use crate::nips::nip59;
pub use crate::nips::nip65::{self, *};
pub use crate::signer::*;
pub use crate::types::time::*;
pub use crate::types::url::*;
