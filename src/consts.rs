// SPDX-License-Identifier: GPL-3.0-or-later

pub mod display {
    // Landscape orientation, see MADCTL_LANDSCAPE.
    pub const WIDTH: u16 = 320;
    pub const HEIGHT: u16 = 240;
    // Memory access control: row/column exchange + BGR.
    pub const MADCTL_LANDSCAPE: u8 = 0x28;
    pub const SPI_FREQ_HZ: u32 = 20_000_000;
    // Size of the stack buffer used to stream pixels to the panel.
    pub const PIXEL_CHUNK_LEN: usize = 64;
}

pub mod touch_screen {
    // The ADC gives 12 bits.
    pub const FULL_SCALE: u16 = 4095;
    // Readings at or below that are considered as no touch.
    pub const PRESS_THRESHOLD: u16 = 100;

    // Time between two checks of the touch detection line.
    pub const POLL_DELAY_MS: u64 = 10;
    // Time the touch detection line must stay active to be a touch.
    pub const DEBOUNCE_DELAY_MS: u64 = 20;

    // Number of samples buffered between the touch task and the UI task.
    pub const QUEUE_DEPTH: usize = 8;

    // XPT2046 datasheet says 2.5MHz max.
    pub const SPI_FREQ_HZ: u32 = 2_000_000;
}

pub mod calibration {
    // Display coordinates of the calibration targets.
    // top-left, top-right, bottom-right, bottom-left, center.
    pub const NUM_POINTS: usize = 5;
    pub const POINTS: [(u16, u16); NUM_POINTS] = [
        (10, 10),
        (310, 10),
        (310, 230),
        (10, 230),
        (160, 120),
    ];

    // When false, any touch is accepted for the current point.
    pub const STRICT_POINT_MATCHING: bool = false;
    // Maximum distance between the touch and the target, in pixels.
    pub const TOLERANCE_RADIUS: u16 = 40;

    pub const CALIBRATE_ON_BOOT: bool = true;
    pub const START_DELAY_MS: u64 = 1000;
    // How long the collected point stays green before the next one shows up.
    pub const POINT_SETTLE_DELAY_MS: u64 = 1000;
    // How long "Results Saved!" and friends stay on screen.
    pub const RESULT_NOTICE_DELAY_MS: u64 = 2000;

    // Menu hit zones, on the display Y axis. Tested in this order.
    pub const MENU_SAVE_Y: (i32, i32) = (35, 60);
    pub const MENU_DISCARD_Y: (i32, i32) = (60, 85);
    pub const MENU_RECALIBRATE_Y: (i32, i32) = (85, 110);
}

pub mod ui {
    // Period of the UI loop when no touch comes in.
    pub const REFRESH_INTERVAL_MS: u64 = 50;
    // Samples of one contact come every debounce + poll delay. A larger gap
    // means some were dropped from the touch queue.
    pub const CONTACT_GAP_MS: u64 = 100;

    pub const CROSSHAIR_HALF_LENGTH: i32 = 10;
    pub const CROSSHAIR_THICKNESS: u32 = 3;
    pub const TOUCH_ECHO_SIZE: u32 = 3;

    // Idle screen "Calibrate" button.
    pub const CALIBRATE_BUTTON: (i32, i32, u32, u32) = (90, 150, 140, 40);
}
