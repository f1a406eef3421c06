//! End-to-end tests: synthetic measurements through the tracking pipeline,
//! the alert machine and the gateway down to a counting transport.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use dropwatch_alert::{
    AlertMachine, AlertState, DirectionSource, LogAlarm, Pipeline, PipelineConfig, Transition,
    TriggerGateway,
};
use dropwatch_notify::{
    ChannelError, ContactTarget, DispatchPool, FanOut, FanOutPlan, Receipt, Transport,
};
use dropwatch_tracking::{BoundingBox, Detector, DirectionEvent, Measurement};

// =============================================================================
// Test fixtures
// =============================================================================

#[derive(Default)]
struct CountingTransport {
    calls: AtomicUsize,
    messages: AtomicUsize,
}

impl CountingTransport {
    fn attempts(&self) -> usize {
        self.calls.load(Ordering::SeqCst) + self.messages.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for CountingTransport {
    fn name(&self) -> &'static str {
        "counting"
    }

    async fn call(&self, _target: &ContactTarget) -> Result<Receipt, ChannelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Receipt::new("CA"))
    }

    async fn sms(&self, _target: &ContactTarget) -> Result<Receipt, ChannelError> {
        self.messages.fetch_add(1, Ordering::SeqCst);
        Ok(Receipt::new("SM"))
    }
}

/// Replays a fixed list of detector results, one per frame index.
struct ScriptedDetector {
    script: Vec<Option<BoundingBox>>,
}

impl Detector for ScriptedDetector {
    type Frame = usize;

    fn detect(&mut self, frame: &usize) -> Option<BoundingBox> {
        self.script.get(*frame).copied().flatten()
    }
}

struct Harness {
    transport: Arc<CountingTransport>,
    gateway: Arc<TriggerGateway>,
    alarm: Arc<LogAlarm>,
    pipeline: Pipeline,
}

const ROUNDS: u32 = 3;
const TARGETS: usize = 2;

fn harness(direction_source: DirectionSource) -> Harness {
    let transport = Arc::new(CountingTransport::default());
    let fan_out = FanOut::new(transport.clone(), DispatchPool::new(4));
    let plan = FanOutPlan::new(
        vec![
            ContactTarget::parse("+15550100001").unwrap(),
            ContactTarget::parse("+15550100002").unwrap(),
        ],
        ROUNDS,
        Duration::from_secs(30),
    );
    let gateway = Arc::new(TriggerGateway::new(fan_out, plan).unwrap());
    let alarm = Arc::new(LogAlarm::new());
    let machine = AlertMachine::new(gateway.clone(), alarm.clone());
    let config = PipelineConfig {
        direction_source,
        ..PipelineConfig::default()
    };

    Harness {
        transport,
        gateway,
        alarm,
        pipeline: Pipeline::new(config, machine),
    }
}

fn ys(harness: &mut Harness, values: &[f64]) -> Vec<DirectionEvent> {
    values
        .iter()
        .map(|&y| {
            harness
                .pipeline
                .process_measurement(Measurement::new(50.0, y))
                .unwrap()
                .event
        })
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

/// y = 100, 120, 90: Idle -> Active -> Idle, one fan-out that still runs all
/// its rounds after the state went back to idle.
#[tokio::test(start_paused = true)]
async fn test_fall_then_rise_runs_one_complete_fan_out() {
    let mut h = harness(DirectionSource::Smoothed);

    let outcomes: Vec<_> = [100.0, 120.0, 90.0]
        .iter()
        .map(|&y| h.pipeline.process_measurement(Measurement::new(50.0, y)).unwrap())
        .collect();

    let events: Vec<_> = outcomes.iter().map(|o| o.event).collect();
    assert_eq!(
        events,
        vec![
            DirectionEvent::Unknown,
            DirectionEvent::Descending,
            DirectionEvent::Ascending
        ]
    );

    let transitions: Vec<_> = outcomes.iter().map(|o| o.transition).collect();
    assert_eq!(
        transitions,
        vec![Transition::None, Transition::Activated, Transition::Deactivated]
    );
    assert_eq!(outcomes[1].state, AlertState::Active);
    assert_eq!(h.gateway.status(), AlertState::Idle);
    assert!(!h.alarm.is_sounding());

    h.gateway.drain().await;

    let snapshot = h.gateway.snapshot();
    assert_eq!(snapshot.activations, 1);
    assert_eq!(snapshot.dispatches, 1);
    assert_eq!(h.transport.attempts(), ROUNDS as usize * TARGETS * 2);
}

/// A long fall produces Descending every frame but only one activation.
#[tokio::test(start_paused = true)]
async fn test_continuous_fall_activates_once() {
    let mut h = harness(DirectionSource::Raw);

    let events = ys(&mut h, &[10.0, 20.0, 30.0, 40.0, 55.0, 70.0]);

    assert_eq!(events[0], DirectionEvent::Unknown);
    assert!(events[1..].iter().all(|e| *e == DirectionEvent::Descending));
    assert_eq!(h.gateway.status(), AlertState::Active);
    assert!(h.alarm.is_sounding());

    h.gateway.drain().await;
    assert_eq!(h.gateway.snapshot().dispatches, 1);
    assert_eq!(h.transport.attempts(), ROUNDS as usize * TARGETS * 2);
}

/// A rising object never activates.
#[tokio::test(start_paused = true)]
async fn test_rise_never_activates() {
    let mut h = harness(DirectionSource::Raw);

    let events = ys(&mut h, &[400.0, 300.0, 250.0, 100.0]);

    assert_eq!(events[0], DirectionEvent::Unknown);
    assert!(events[1..].iter().all(|e| *e == DirectionEvent::Ascending));
    assert_eq!(h.gateway.snapshot().activations, 0);
    h.gateway.drain().await;
    assert_eq!(h.transport.attempts(), 0);
}

/// Without hysteresis every reversal at the apex is a new activation edge.
#[tokio::test(start_paused = true)]
async fn test_apex_oscillation_reactivates() {
    let mut h = harness(DirectionSource::Raw);

    ys(&mut h, &[10.0, 20.0, 10.0, 20.0]);

    assert_eq!(h.gateway.snapshot().activations, 2);
    h.gateway.drain().await;
    assert_eq!(h.transport.attempts(), 2 * ROUNDS as usize * TARGETS * 2);
}

/// Manual trigger while the pipeline is falling: one fan-out total.
#[tokio::test(start_paused = true)]
async fn test_manual_and_automatic_share_idempotence() {
    let mut h = harness(DirectionSource::Raw);

    assert!(h.gateway.trigger().activated);
    ys(&mut h, &[10.0, 20.0, 30.0]);

    assert_eq!(h.gateway.snapshot().dispatches, 1);
    h.gateway.drain().await;
}

/// Reset does not cancel a fan-out already running.
#[tokio::test(start_paused = true)]
async fn test_reset_keeps_in_flight_fan_out() {
    let h = harness(DirectionSource::Raw);

    assert!(h.gateway.trigger().activated);
    tokio::task::yield_now().await;
    assert_eq!(h.gateway.reset(), AlertState::Active);

    h.gateway.drain().await;
    assert_eq!(h.transport.attempts(), ROUNDS as usize * TARGETS * 2);
}

/// An operator reset clears the flag; the next rise still silences the siren.
#[tokio::test(start_paused = true)]
async fn test_rise_after_operator_reset_silences_alarm() {
    let mut h = harness(DirectionSource::Raw);

    ys(&mut h, &[10.0, 20.0]);
    assert!(h.alarm.is_sounding());

    assert_eq!(h.gateway.reset(), AlertState::Active);
    assert!(h.alarm.is_sounding());

    let events = ys(&mut h, &[15.0, 5.0, 1.0]);

    assert!(events.iter().all(|e| *e == DirectionEvent::Ascending));
    assert_eq!(h.gateway.status(), AlertState::Idle);
    assert!(!h.alarm.is_sounding());
    h.gateway.drain().await;
}

/// A fall that stops dead: the smoothed feed overshoots and reads the plateau
/// as a rise, the raw feed keeps the alert active.
#[tokio::test(start_paused = true)]
async fn test_plateau_after_fall_per_direction_source() {
    let plateau = [100.0, 120.0, 140.0, 140.0, 140.0, 140.0];

    let mut smoothed = harness(DirectionSource::Smoothed);
    let events = ys(&mut smoothed, &plateau);
    assert_eq!(
        events,
        vec![
            DirectionEvent::Unknown,
            DirectionEvent::Descending,
            DirectionEvent::Descending,
            DirectionEvent::Descending,
            DirectionEvent::Ascending,
            DirectionEvent::Ascending,
        ]
    );
    assert_eq!(smoothed.gateway.status(), AlertState::Idle);

    let mut raw = harness(DirectionSource::Raw);
    let events = ys(&mut raw, &plateau);
    assert_eq!(events[0], DirectionEvent::Unknown);
    assert!(events[1..].iter().all(|e| *e == DirectionEvent::Descending));
    assert_eq!(raw.gateway.status(), AlertState::Active);

    smoothed.gateway.drain().await;
    raw.gateway.drain().await;
}

/// Detection misses and invalid measurements leave tracking state untouched.
#[tokio::test]
async fn test_misses_and_invalid_measurements_are_skipped() {
    let mut h = harness(DirectionSource::Raw);
    let mut detector = ScriptedDetector {
        script: vec![
            Some(BoundingBox::new(40.0, 90.0, 60.0, 110.0)),
            None,
            Some(BoundingBox::new(40.0, 80.0, 60.0, 100.0)),
        ],
    };

    let first = h.pipeline.process_frame(&mut detector, &0).unwrap();
    assert_eq!(first.measurement, Measurement::new(50.0, 100.0));
    assert_eq!(h.pipeline.estimator().updates(), 1);

    assert!(h.pipeline.process_frame(&mut detector, &1).is_none());
    assert!(h
        .pipeline
        .process_measurement(Measurement::new(f64::NAN, 10.0))
        .is_none());
    assert_eq!(h.pipeline.estimator().updates(), 1);

    let third = h.pipeline.process_frame(&mut detector, &2).unwrap();
    assert_eq!(third.event, DirectionEvent::Ascending);

    let stats = h.pipeline.stats();
    assert_eq!(stats.processed, 2);
    assert_eq!(stats.missed, 1);
    assert_eq!(stats.rejected, 1);
}

/// Look-ahead from the pipeline follows the estimator's velocity.
#[tokio::test]
async fn test_look_ahead_tracks_velocity() {
    let mut h = harness(DirectionSource::Smoothed);

    let mut last = None;
    for i in 0..30 {
        let t = f64::from(i);
        last = h
            .pipeline
            .process_measurement(Measurement::new(2.0 * t, 5.0 * t));
    }

    let last = last.unwrap();
    assert!((last.look_ahead.x - (last.smoothed.x + 2.0)).abs() < 0.01);
    assert!((last.look_ahead.y - (last.smoothed.y + 5.0)).abs() < 0.01);
}
