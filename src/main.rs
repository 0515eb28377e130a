// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

#![no_main]
#![no_std]

use core::cell::RefCell;

use cortex_m_rt::entry;
use critical_section::Mutex;
use panic_halt as _;

#[cfg(feature = "defmt")]
use defmt_rtt as _;

use stm32f7xx_hal::pac::{self, interrupt};

use sonar_scope::app::Dispatcher;
use sonar_scope::config::{ScanTiming, STM32F767_LAYOUT};
use sonar_scope::hw::{adc, board, capture, usart, InternalFlash, Stm32Board};
use sonar_scope::log_info;
use sonar_scope::protocol::CommandReceiver;
use sonar_scope::storage::{FileStore, SharedStore};
use sonar_scope::DeviceContext;

static CONTEXT: DeviceContext = DeviceContext::new();
static STORE: SharedStore<InternalFlash> = Mutex::new(RefCell::new(FileStore::new(
    InternalFlash::new(),
    STM32F767_LAYOUT,
)));

#[entry]
fn main() -> ! {
    // Peripherals
    let dp = pac::Peripherals::take().unwrap();
    let cp = cortex_m::Peripherals::take().unwrap();

    let mut board = Stm32Board::new(dp, cp);

    let mut app = Dispatcher::new(&CONTEXT, &STORE, ScanTiming::new());
    app.restore();

    board.listen();
    log_info!("sonar-scope ready");

    app.run(&mut board)
}

#[interrupt]
fn USART3() {
    static mut RECEIVER: CommandReceiver = CommandReceiver::new();

    while let Some(byte) = usart::read_byte() {
        RECEIVER.on_byte(byte, &CONTEXT, &STORE);
    }
}

#[interrupt]
fn TIM3() {
    let event = capture::service();
    if let Some(timestamp) = event.capture {
        CONTEXT.echo.on_capture(timestamp);
    }
    if event.overflow {
        CONTEXT.echo.on_overflow();
    }
}

#[interrupt]
fn ADC() {
    if let Some(value) = adc::take_result() {
        CONTEXT.adc.on_conversion_complete(value);
    }
}

#[interrupt]
fn EXTI15_10() {
    if board::take_button_edge() {
        CONTEXT.press_button();
    }
}
