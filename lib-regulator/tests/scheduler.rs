mod common;

use common::{sine_raw, RecordingTimer, ScriptedInput, TimerEvent};
use embassy_futures::block_on;
use lib_regulator::{
    channel::{AlarmState, ChannelMonitor},
    frequency::LineFrequency,
    state::RegulatorState,
    timer::TimerId,
    SampleScheduler, DEFAULT_CONFIG, WINDOW_SIZE,
};

fn ramp(channel: lib_regulator::ChannelId, n: usize) -> i16 {
    (channel.number() as i16) * 1000 + n as i16
}

#[test]
fn windows_hold_one_full_cycle_per_channel() {
    let state = RegulatorState::new(LineFrequency::from_hz(50.0));
    let mut parts = state.split().unwrap();
    let timer = RecordingTimer::default();
    let mut scheduler = SampleScheduler::new(parts.scheduler, ScriptedInput::new(ramp), &DEFAULT_CONFIG);

    for slot in 0..WINDOW_SIZE - 1 {
        assert!(!scheduler.tick(&timer));
        assert_eq!(scheduler.position(), slot + 1);
    }
    for monitor in parts.monitors.iter_mut() {
        assert!(monitor.window.try_take().is_none());
    }

    assert!(scheduler.tick(&timer));
    assert_eq!(scheduler.position(), 0);

    for (c, monitor) in parts.monitors.iter_mut().enumerate() {
        let window = monitor.window.try_take().unwrap();
        for (p, sample) in window.samples().iter().enumerate() {
            assert_eq!(*sample, c as i16 * 1000 + p as i16);
        }
    }
    assert_eq!(parts.telemetry.reference_window().sample(5), 5);
}

#[test]
fn missed_read_leaves_stale_slot() {
    let state = RegulatorState::new(LineFrequency::from_hz(50.0));
    let mut parts = state.split().unwrap();
    let timer = RecordingTimer::default();

    let mut input = ScriptedInput::new(ramp);
    input.failures.push((1, WINDOW_SIZE + 3));
    let mut scheduler = SampleScheduler::new(parts.scheduler, input, &DEFAULT_CONFIG);

    for _ in 0..2 * WINDOW_SIZE {
        scheduler.tick(&timer);
    }

    let window = parts.monitors[1].window.try_take().unwrap();
    assert_eq!(window.sample(3), 1003);
    assert_eq!(window.sample(4), 1000 + WINDOW_SIZE as i16 + 4);

    let other = parts.monitors[2].window.try_take().unwrap();
    assert_eq!(other.sample(3), 2000 + WINDOW_SIZE as i16 + 3);
}

#[test]
fn accepted_frequency_retunes_sampling() {
    let state = RegulatorState::new(LineFrequency::from_hz(50.0));
    let parts = state.split().unwrap();
    let timer = RecordingTimer::default();

    // 51 Hz line sampled at the 50 Hz interval
    let samples_per_cycle = 16.0 * 50.0 / 51.0;
    let input = ScriptedInput::new(move |_, n| sine_raw(2.5, samples_per_cycle, n));
    let mut scheduler = SampleScheduler::new(parts.scheduler, input, &DEFAULT_CONFIG);
    scheduler.start(&timer);

    assert!(timer.is_enabled(TimerId::Sampling));
    assert_eq!(timer.periods(TimerId::Sampling), vec![1_250_000]);

    // the scripted input ignores the retune, so stop at the first estimate
    for _ in 0..3 * WINDOW_SIZE {
        scheduler.tick(&timer);
        if timer.periods(TimerId::Sampling).len() > 1 {
            break;
        }
    }

    let periods = timer.periods(TimerId::Sampling);
    assert_eq!(periods.len(), 2);
    let retuned = periods[1];
    let expected = 1_000_000_000.0 / 51.0 / 16.0;
    assert!((retuned as f32 - expected).abs() < expected * 0.002, "{}", retuned);
    assert!(timer
        .events
        .borrow()
        .iter()
        .any(|e| *e == (TimerId::Sampling, TimerEvent::Period { period_ns: retuned, restart: true })));

    let line = parts.telemetry.frequency();
    assert!((line.frequency_hz - 51.0).abs() < 0.1);
}

#[test]
fn missed_reference_read_does_not_skew_frequency() {
    let state = RegulatorState::new(LineFrequency::from_hz(50.0));
    let parts = state.split().unwrap();
    let timer = RecordingTimer::default();

    // 48 Hz line sampled at the 50 Hz interval, one reference sample lost
    let samples_per_cycle = 16.0 * 50.0 / 48.0;
    let mut input = ScriptedInput::new(move |_, n| sine_raw(2.5, samples_per_cycle, n));
    input.failures.push((DEFAULT_CONFIG.reference_channel.number(), 20));
    let mut scheduler = SampleScheduler::new(parts.scheduler, input, &DEFAULT_CONFIG);
    scheduler.start(&timer);

    for _ in 0..5 * WINDOW_SIZE {
        scheduler.tick(&timer);
        if timer.periods(TimerId::Sampling).len() > 1 {
            break;
        }
    }

    let periods = timer.periods(TimerId::Sampling);
    assert_eq!(periods.len(), 2);
    let line = parts.telemetry.frequency();
    assert!((line.frequency_hz - 48.0).abs() < 0.1, "{}", line.frequency_hz);
}

#[test]
fn out_of_band_line_keeps_timing() {
    let state = RegulatorState::new(LineFrequency::from_hz(50.0));
    let parts = state.split().unwrap();
    let timer = RecordingTimer::default();

    let samples_per_cycle = 16.0 * 50.0 / 40.0;
    let input = ScriptedInput::new(move |_, n| sine_raw(2.5, samples_per_cycle, n));
    let mut scheduler = SampleScheduler::new(parts.scheduler, input, &DEFAULT_CONFIG);

    for _ in 0..6 * WINDOW_SIZE {
        scheduler.tick(&timer);
    }

    assert!(timer.periods(TimerId::Sampling).is_empty());
    assert_eq!(parts.telemetry.frequency().frequency_hz, 50.0);
}

#[test]
fn monitors_classify_scheduled_windows() {
    let state = RegulatorState::new(LineFrequency::from_hz(50.0));
    let parts = state.split().unwrap();
    let timer = RecordingTimer::default();

    let levels = [3.5f32, 1.5, 2.5];
    let input = ScriptedInput::new(move |ch, n| sine_raw(levels[ch.index()], 16.0, n));
    let mut scheduler = SampleScheduler::new(parts.scheduler, input, &DEFAULT_CONFIG);
    let mut monitors = parts.monitors.map(|ports| ChannelMonitor::new(ports, &DEFAULT_CONFIG));

    for _ in 0..WINDOW_SIZE {
        scheduler.tick(&timer);
    }

    let expected = [AlarmState::OverVoltage, AlarmState::UnderVoltage, AlarmState::Normal];
    for (monitor, alarm) in monitors.iter_mut().zip(expected) {
        let status = block_on(monitor.next_cycle(&timer));
        assert_eq!(status.reading.alarm, alarm);
        assert!((status.reading.rms - levels[monitor.channel().index()]).abs() < 0.01);
    }

    let over = parts.telemetry.channel(lib_regulator::ChannelId::new(0).unwrap());
    assert!((over.deviation - 0.5).abs() < 0.01);
}
