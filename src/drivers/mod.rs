// SPDX-License-Identifier: GPL-3.0-or-later

pub mod display;
pub mod touch_screen;
