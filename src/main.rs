// SPDX-License-Identifier: GPL-3.0-or-later

#![no_std]
#![no_main]

#[macro_use]
extern crate log;

mod logging;
mod machine;

use embassy_executor::{Executor, InterruptExecutor};
use embassy_stm32::{
    Config,
    interrupt,
    interrupt::{InterruptExt, Priority},
};
use embassy_time::{Delay, Duration, Timer};
use static_cell::StaticCell;

use tft_touch::{
    calibration::{Calibration, CalibrationConfig, SharedTransform},
    consts::calibration::{CALIBRATE_ON_BOOT, START_DELAY_MS},
    drivers::touch_screen::TouchScreen,
    ui::{self, TouchQueue, Ui},
};
use machine::{Machine, TftDisplay, TouchDevice};

static TOUCH_SAMPLES: TouchQueue = TouchQueue::new();
static ACTIVE_TRANSFORM: SharedTransform = SharedTransform::new();

static EXECUTOR_MEDIUM: InterruptExecutor = InterruptExecutor::new();
static EXECUTOR_LOW: StaticCell<Executor> = StaticCell::new();

mod medium_priority_tasks {
    use super::*;

    #[interrupt]
    unsafe fn USART6() {
        EXECUTOR_MEDIUM.on_interrupt()
    }

    #[embassy_executor::task]
    pub async fn touch_screen_task(device: TouchDevice) {
        let mut touch_screen = TouchScreen::new(device, &ACTIVE_TRANSFORM);
        loop {
            let sample = touch_screen.next_sample().await;
            // The sampling cadence must not depend on the UI. If the UI
            // is behind, the sample is lost.
            if TOUCH_SAMPLES.try_send(sample).is_err() {
                trace!("Touch queue full, dropping {:?}", sample.event);
            }
        }
    }
}

mod low_priority_tasks {
    use super::*;
    use embassy_stm32::gpio::Output;

    #[embassy_executor::task]
    pub async fn ui_task(mut display: TftDisplay, mut backlight: Output<'static>) {
        if let Err(e) = display.init(&mut Delay) {
            error!("Display init failed: {:?}", e);
        }
        backlight.set_high();

        let calibration = Calibration::new(CalibrationConfig::default(), &ACTIVE_TRANSFORM);
        let mut ui = Ui::new(calibration);

        if CALIBRATE_ON_BOOT {
            Timer::after(Duration::from_millis(START_DELAY_MS)).await;
            ui.calibration_mut().start_calibration();
        }

        ui::run(&mut ui, &mut display, TOUCH_SAMPLES.receiver()).await
    }
}

#[cortex_m_rt::entry]
fn main() -> ! {
    logging::init_logging();
    info!("Booting");

    let machine = Machine::new(embassy_stm32::init(Config::default()));

    // Medium priority executor. It interrupts the UI drawing to sample the
    // touch screen on time.
    {
        interrupt::USART6.set_priority(Priority::P6);
        let spawner = EXECUTOR_MEDIUM.start(interrupt::USART6);
        spawner.must_spawn(medium_priority_tasks::touch_screen_task(machine.touch_screen));
    }

    // The low priority executor runs the UI, it owns the display and the
    // calibration state.
    let executor = EXECUTOR_LOW.init(Executor::new());
    executor.run(|spawner| {
        spawner.must_spawn(low_priority_tasks::ui_task(machine.display, machine.backlight));
    })
}

pub mod runtime {
    #[inline(never)]
    #[panic_handler]
    fn panic(info: &core::panic::PanicInfo) -> ! {
        error!("{}", info);
        loop {}
    }
}
