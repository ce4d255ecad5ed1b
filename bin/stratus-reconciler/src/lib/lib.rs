// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! Converges cloud virtual machines toward their declared specs.
//!
//! [`vm::VmService`] is the entry point: given a [`scope::VmScope`] and the
//! provider clients, it creates every declared VM that doesn't exist yet and
//! deletes them on request. [`publicip::PublicIpService`] does the same for
//! public IP addresses, and [`subscription`] resolves the subscription a
//! cluster's machines are defaulted against. [`driver`] wires these together
//! against an in-memory provider for the command-line tool.

pub mod converters;
pub mod driver;
mod error;
pub mod publicip;
pub mod scope;
pub mod subscription;
pub mod vm;

pub use error::ErrorKind;
