// SPDX-License-Identifier: GPL-3.0-or-later

#![cfg_attr(not(test), no_std)]

#[macro_use]
extern crate log;

pub mod consts;
pub mod calibration;
pub mod drivers;
pub mod ui;
