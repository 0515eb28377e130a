// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! NUCLEO-F767ZI wiring and the [`Board`](crate::hw::traits::Board) implementation.
//!
//! | Function        | Peripheral      | Pin(s)          |
//! |-----------------|-----------------|-----------------|
//! | Host link       | USART3 (AF7)    | PD8 TX, PD9 RX  |
//! | Light sensor    | ADC1 IN3 / IN10 | PA3, PC0        |
//! | Echo capture    | TIM3 CH1 (AF2)  | PA6             |
//! | Servo           | TIM4 CH1 (AF2)  | PD12            |
//! | Sonar trigger   | GPIO            | PC8             |
//! | LCD RS, EN      | GPIO            | PE7, PE8        |
//! | LCD D4..D7      | GPIO            | PE9..PE12       |
//! | User button     | EXTI13          | PC13            |

use cortex_m::delay::Delay;
use cortex_m::peripheral::NVIC;

use stm32f7xx_hal::{
    gpio::{
        gpioc::PC8,
        gpioe::{PE10, PE11, PE12, PE7, PE8, PE9},
        Output, PushPull,
    },
    pac::{self, Interrupt},
    prelude::*,
    serial::{Config, Serial},
};

use crate::config::{BAUD_RATE, TRIGGER_PULSE_US};
use crate::hw::adc::Adc1;
use crate::hw::capture::EchoTimer;
use crate::hw::lcd::Lcd;
use crate::hw::pwm::ServoPwm;
use crate::hw::traits::{
    BusyDelay, CharDisplay, HostLink, IdleWait, LightAdc, ServoOutput, SonarTrigger,
};
use crate::hw::usart::{self, Usart};

const BUTTON_LINE: u32 = 13;

type BoardLcd = Lcd<
    PE7<Output<PushPull>>,
    PE8<Output<PushPull>>,
    PE9<Output<PushPull>>,
    PE10<Output<PushPull>>,
    PE11<Output<PushPull>>,
    PE12<Output<PushPull>>,
>;

pub struct Stm32Board {
    host: Usart<pac::USART3>,
    adc: Adc1,
    echo: EchoTimer,
    servo: ServoPwm,
    trigger: PC8<Output<PushPull>>,
    lcd: BoardLcd,
    delay: Delay,
}

impl Stm32Board {
    /// Bring up clocks, pins and peripherals. Interrupts stay masked until [`Self::listen`].
    pub fn new(dp: pac::Peripherals, cp: cortex_m::Peripherals) -> Self {
        // Clocks
        let rcc = dp.RCC.constrain();
        let clocks = rcc.cfgr.freeze();
        let timclk = clocks.timclk1().raw();
        let mut delay = Delay::new(cp.SYST, clocks.sysclk().raw());

        // GPIO
        let gpioa = dp.GPIOA.split();
        let gpioc = dp.GPIOC.split();
        let gpiod = dp.GPIOD.split();
        let gpioe = dp.GPIOE.split();

        // USART3 (ST-LINK VCP)
        let tx = gpiod.pd8.into_alternate::<7>();
        let rx = gpiod.pd9.into_alternate::<7>();
        let usart_cfg = Config {
            baud_rate: BAUD_RATE.bps(),
            ..Default::default()
        };
        let serial = Serial::new(dp.USART3, (tx, rx), &clocks, usart_cfg);
        let host = Usart::new(serial);

        // Light sensor taps
        let _tap_a = gpioa.pa3.into_analog();
        let _tap_b = gpioc.pc0.into_analog();
        let adc = Adc1::new(dp.ADC1);

        // Echo in, trigger out
        let _echo_pin = gpioa.pa6.into_alternate::<2>();
        let echo = EchoTimer::tim3(dp.TIM3, timclk);
        let mut trigger = gpioc.pc8.into_push_pull_output();
        trigger.set_low();

        // Servo
        let _servo_pin = gpiod.pd12.into_alternate::<2>();
        let servo = ServoPwm::tim4(dp.TIM4, timclk);

        // LCD
        let lcd = Lcd::new(
            gpioe.pe7.into_push_pull_output(),
            gpioe.pe8.into_push_pull_output(),
            (
                gpioe.pe9.into_push_pull_output(),
                gpioe.pe10.into_push_pull_output(),
                gpioe.pe11.into_push_pull_output(),
                gpioe.pe12.into_push_pull_output(),
            ),
            &mut delay,
        );

        // User button: rising edge on PC13
        let _button = gpioc.pc13.into_floating_input();
        configure_button(&dp.SYSCFG, &dp.EXTI);

        Self {
            host,
            adc,
            echo,
            servo,
            trigger,
            lcd,
            delay,
        }
    }

    /// Enable peripheral interrupt sources and unmask them in the NVIC.
    pub fn listen(&mut self) {
        usart::listen_usart3();
        unsafe {
            NVIC::unmask(Interrupt::USART3);
            NVIC::unmask(Interrupt::TIM3);
            NVIC::unmask(Interrupt::ADC);
            NVIC::unmask(Interrupt::EXTI15_10);
        }
    }
}

fn configure_button(syscfg: &pac::SYSCFG, exti: &pac::EXTI) {
    let rcc = unsafe { &*pac::RCC::ptr() };
    rcc.apb2enr.modify(|_, w| w.syscfgen().set_bit());

    // EXTICR4[7:4] = port C
    syscfg
        .exticr4
        .modify(|r, w| unsafe { w.bits((r.bits() & !(0xF << 4)) | (0x2 << 4)) });

    let mask = 1 << BUTTON_LINE;
    exti.rtsr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
    exti.ftsr.modify(|r, w| unsafe { w.bits(r.bits() & !mask) });
    exti.imr.modify(|r, w| unsafe { w.bits(r.bits() | mask) });
}

/// Acknowledge a pending button edge. Called from the EXTI15_10 interrupt.
pub fn take_button_edge() -> bool {
    let exti = unsafe { &*pac::EXTI::ptr() };
    let mask = 1 << BUTTON_LINE;
    if exti.pr.read().bits() & mask != 0 {
        exti.pr.write(|w| unsafe { w.bits(mask) });
        true
    } else {
        false
    }
}

impl IdleWait for Stm32Board {
    fn wait_for_interrupt(&mut self) {
        cortex_m::asm::wfi();
    }

    /// Check with interrupts masked, then sleep. A pending interrupt still wakes `wfi` and runs
    /// as soon as the mask is lifted, so a wake-up between check and sleep is never lost.
    fn wait_until<C: FnMut() -> bool>(&mut self, mut ready: C) {
        loop {
            cortex_m::interrupt::disable();
            if ready() {
                unsafe { cortex_m::interrupt::enable() };
                return;
            }
            cortex_m::asm::wfi();
            unsafe { cortex_m::interrupt::enable() };
        }
    }
}

impl SonarTrigger for Stm32Board {
    fn arm_capture(&mut self) {
        self.echo.arm();
    }

    fn pulse_trigger(&mut self) {
        self.trigger.set_high();
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low();
    }
}

impl LightAdc for Stm32Board {
    fn start_conversion(&mut self, channel: u8) {
        self.adc.start_conversion(channel);
    }
}

impl ServoOutput for Stm32Board {
    fn set_pulse_us(&mut self, pulse_us: u16) {
        self.servo.set_pulse_us(pulse_us);
    }
}

impl HostLink for Stm32Board {
    fn write_bytes(&mut self, bytes: &[u8]) {
        self.host.write_bytes(bytes);
    }
}

impl BusyDelay for Stm32Board {
    fn delay_ms(&mut self, ms: u32) {
        self.delay.delay_ms(ms);
    }

    fn delay_us(&mut self, us: u32) {
        self.delay.delay_us(us);
    }
}

impl CharDisplay for Stm32Board {
    fn clear(&mut self) {
        self.lcd.clear(&mut self.delay);
    }

    fn set_cursor(&mut self, row: u8, col: u8) {
        self.lcd.set_cursor(row, col, &mut self.delay);
    }

    fn write_byte(&mut self, byte: u8) {
        self.lcd.write_char(byte, &mut self.delay);
    }
}
