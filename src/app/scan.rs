// SPDX-License-Identifier: MIT
// © 2025–2026 Christopher Liu

//! Continuous measurement routines.
//!
//! Each routine loops until the shared mode changes, checking it before every measurement. Sweeps
//! park the servo at 0°, step through every angle and start over.

use crate::config::{ScanTiming, CALIBRATION_SLOTS, ECHO_SAMPLES_PER_ANGLE, SWEEP_STEPS};
use crate::context::{DeviceContext, Mode};
use crate::drivers::servo;
use crate::hw::traits::Board;
use crate::protocol::telemetry::{send_pair, send_triple};

/// Sweep once, calling `measure` at every angle. Returns `false` if the mode changed.
fn sweep<B, M>(
    ctx: &DeviceContext,
    board: &mut B,
    mode: Mode,
    settle_ms: u32,
    step_ms: u32,
    mut measure: M,
) -> bool
where
    B: Board,
    M: FnMut(&mut B, u16) -> bool,
{
    servo::aim(board, 0);
    board.delay_ms(settle_ms);

    for angle in 0..SWEEP_STEPS {
        if ctx.mode() != mode {
            return false;
        }
        servo::aim(board, angle);
        board.delay_ms(step_ms);
        if !measure(&mut *board, angle) {
            return false;
        }
    }
    true
}

/// Send the calibration table as `<slot>:<value>` lines.
fn replay_calibration<B: Board>(board: &mut B, calibration: &[u16; CALIBRATION_SLOTS]) {
    for (slot, &value) in calibration.iter().enumerate() {
        send_pair(board, slot as u32, value as u32);
    }
}

/// Echo sweep: `ECHO_SAMPLES_PER_ANGLE` lines of `<angle>:<ticks>` per angle.
pub fn object_scan<B: Board>(ctx: &DeviceContext, board: &mut B, timing: &ScanTiming) {
    let mode = Mode::ObjectScan;

    while ctx.mode() == mode {
        let sample = |board: &mut B, angle: u16| {
            for _ in 0..ECHO_SAMPLES_PER_ANGLE {
                if ctx.mode() != mode {
                    return false;
                }
                let echo = ctx.echo.trigger_and_measure(board);
                send_pair(board, angle as u32, echo.ticks() as u32);
                board.delay_ms(timing.echo_gap_ms);
            }
            true
        };
        let completed = sweep(ctx, board, mode, timing.sweep_settle_ms, timing.echo_step_ms, sample);
        if completed {
            log_debug!("object sweep complete");
        }
    }
}

/// Light sweep: calibration replay, then `<angle>:<light>` per angle.
pub fn light_scan<B: Board>(
    ctx: &DeviceContext,
    board: &mut B,
    timing: &ScanTiming,
    calibration: &[u16; CALIBRATION_SLOTS],
) {
    let mode = Mode::LightScan;

    while ctx.mode() == mode {
        replay_calibration(board, calibration);
        let sample = |board: &mut B, angle: u16| {
            let light = ctx.adc.sample_light(board);
            send_pair(board, angle as u32, light as u32);
            board.delay_ms(timing.light_gap_ms);
            true
        };
        sweep(ctx, board, mode, timing.sweep_settle_ms, timing.light_step_ms, sample);
    }
}

/// Combined sweep: calibration replay, then `<angle>:<ticks>:<light>` per angle.
pub fn object_light_scan<B: Board>(
    ctx: &DeviceContext,
    board: &mut B,
    timing: &ScanTiming,
    calibration: &[u16; CALIBRATION_SLOTS],
) {
    let mode = Mode::ObjectLightScan;

    while ctx.mode() == mode {
        replay_calibration(board, calibration);
        let sample = |board: &mut B, angle: u16| {
            let echo = ctx.echo.trigger_and_measure(board);
            let light = ctx.adc.sample_light(board);
            send_triple(board, angle as u32, echo.ticks() as u32, light as u32);
            board.delay_ms(timing.light_gap_ms);
            true
        };
        sweep(ctx, board, mode, timing.sweep_settle_ms, timing.light_step_ms, sample);
    }
}

/// Fixed-angle ranging: `<angle>:<ticks>` once per period. A new angle request re-aims.
pub fn telemeter<B: Board>(ctx: &DeviceContext, board: &mut B, timing: &ScanTiming) {
    let mut angle = ctx.take_degree_change().unwrap_or_else(|| ctx.degree());
    servo::aim(board, angle);
    board.delay_ms(timing.sweep_settle_ms);

    while ctx.mode() == Mode::Telemeter {
        if let Some(deg) = ctx.take_degree_change() {
            log_info!("telemeter re-aim {} -> {}", angle, deg);
            angle = servo::aim(board, deg);
            board.delay_ms(timing.sweep_settle_ms);
        }

        let echo = ctx.echo.trigger_and_measure(board);
        send_pair(board, angle as u32, echo.ticks() as u32);
        board.delay_ms(timing.telemeter_period_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::drivers::servo::pulse_for_angle;
    use crate::hw::mock::{shared_store, At, MockBoard, SimEvent};

    const FULL_OBJECT_SWEEP: usize = SWEEP_STEPS as usize * ECHO_SAMPLES_PER_ANGLE as usize;

    #[test]
    fn object_sweep_sends_seven_samples_per_angle() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .echo(Some(580))
            .at(At::Lines(FULL_OBJECT_SWEEP), SimEvent::Host(b"8"));

        ctx.set_mode(Mode::ObjectScan);
        object_scan(&ctx, &mut board, &ScanTiming::immediate());
        assert_eq!(ctx.mode(), Mode::Idle);

        let lines = board.lines();
        assert!(lines.len() >= FULL_OBJECT_SWEEP);
        for (i, line) in lines.iter().take(FULL_OBJECT_SWEEP).enumerate() {
            assert_eq!(*line, std::format!("{}:580", i / 7));
        }

        // Park at 0°, then every angle once.
        assert_eq!(board.servo[0], pulse_for_angle(0));
        assert_eq!(board.servo[1], pulse_for_angle(0));
        assert_eq!(board.servo[180], pulse_for_angle(179));
    }

    #[test]
    fn object_scan_reports_timeouts_as_zero() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .echo_plan(&[Some(900), None, Some(1_200)])
            .at(At::Lines(3), SimEvent::Host(b"8"));

        ctx.set_mode(Mode::ObjectScan);
        object_scan(&ctx, &mut board, &ScanTiming::immediate());

        let lines = board.lines();
        assert_eq!(lines[..3], ["0:900", "0:0", "0:1200"]);
    }

    #[test]
    fn object_scan_exits_promptly_on_mode_change() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store).at(At::Lines(10), SimEvent::Host(b"3"));

        ctx.set_mode(Mode::ObjectScan);
        object_scan(&ctx, &mut board, &ScanTiming::immediate());

        assert_eq!(ctx.mode(), Mode::LightScan);
        assert!(board.lines().len() <= 11);
    }

    #[test]
    fn light_scan_replays_calibration_first() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .light(300, 700)
            .at(At::Lines(10 + 180), SimEvent::Host(b"8"));
        let calibration = [10, 20, 30, 40, 50, 60, 70, 80, 90, 100];

        ctx.set_mode(Mode::LightScan);
        light_scan(&ctx, &mut board, &ScanTiming::immediate(), &calibration);

        let lines = board.lines();
        assert_eq!(lines[0], "0:10");
        assert_eq!(lines[9], "9:100");
        assert_eq!(lines[10], "0:300");
        assert_eq!(lines[189], "179:300");
        // The next sweep starts with a fresh replay.
        if lines.len() > 190 {
            assert_eq!(lines[190], "0:10");
        }
    }

    #[test]
    fn combined_scan_sends_triples() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .echo(Some(1_160))
            .light(800, 450)
            .at(At::Lines(12), SimEvent::Host(b"8"));

        ctx.set_mode(Mode::ObjectLightScan);
        object_light_scan(&ctx, &mut board, &ScanTiming::immediate(), &[0; CALIBRATION_SLOTS]);

        let lines = board.lines();
        assert_eq!(lines[10], "0:1160:450");
        assert_eq!(lines[11], "1:1160:450");
    }

    #[test]
    fn telemeter_measures_at_requested_angle_and_reaims() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store)
            .echo(Some(2_000))
            .at(At::Lines(2), SimEvent::Host(b"2150\n"))
            .at(At::Lines(4), SimEvent::Host(b"8"));

        ctx.request_telemeter(45);
        telemeter(&ctx, &mut board, &ScanTiming::immediate());

        let lines = board.lines();
        assert_eq!(lines[..2], ["45:2000", "45:2000"]);
        assert!(lines[3..].iter().all(|l| l == "150:2000"));
        assert_eq!(board.servo[0], pulse_for_angle(45));
        assert!(board.servo.contains(&pulse_for_angle(150)));
    }

    #[test]
    fn telemeter_waits_one_period_between_samples() {
        let ctx = DeviceContext::new();
        let store = shared_store();
        let mut board = MockBoard::new(&ctx, &store).at(At::Lines(3), SimEvent::Host(b"8"));
        let timing = ScanTiming::immediate().with_telemeter_period_ms(1_000);

        ctx.request_telemeter(90);
        telemeter(&ctx, &mut board, &timing);

        let samples = board.lines().len() as u64;
        assert_eq!(board.delayed_ms, samples * 1_000);
    }
}
