// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Common Modul for the location monitor
//!
//! Provides the data types that are shared between the platform, the aggregator and the
//! presentation modules.

pub mod clock;
pub mod location;
pub mod test_helper;
