//! Offline replay of a recorded trajectory through the tracking pipeline.
//!
//! One frame per line:
//!
//! ```text
//! # comment
//! 50,100          centroid
//! 40,90,60,110    bounding box x1,y1,x2,y2
//! -               detection miss (an empty line is a miss too)
//! ```

use dropwatch_alert::{FrameOutcome, Pipeline};
use dropwatch_tracking::{BoundingBox, Detector};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
#[error("line {line}: {message}")]
pub struct ReplayError {
    pub line: usize,
    pub message: String,
}

/// Parse a replay file into one detector result per frame.
pub fn parse_frames(input: &str) -> Result<Vec<Option<BoundingBox>>, ReplayError> {
    input
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim_start().starts_with('#'))
        .map(|(index, line)| {
            parse_line(line).map_err(|message| ReplayError {
                line: index + 1,
                message,
            })
        })
        .collect()
}

fn parse_line(line: &str) -> Result<Option<BoundingBox>, String> {
    let line = line.trim();
    if line.is_empty() || line == "-" {
        return Ok(None);
    }

    let values = line
        .split(',')
        .map(|field| {
            let field = field.trim();
            field
                .parse::<f64>()
                .map_err(|e| format!("invalid number {field:?}: {e}"))
        })
        .collect::<Result<Vec<_>, _>>()?;

    match values[..] {
        // A centroid is a zero-sized box.
        [x, y] => Ok(Some(BoundingBox::new(x, y, x, y))),
        [x1, y1, x2, y2] => Ok(Some(BoundingBox::new(x1, y1, x2, y2))),
        _ => Err(format!("expected 2 or 4 values, found {}", values.len())),
    }
}

/// Detector that plays back parsed frames by index.
pub struct ReplayDetector {
    frames: Vec<Option<BoundingBox>>,
}

impl ReplayDetector {
    pub fn new(frames: Vec<Option<BoundingBox>>) -> Self {
        Self { frames }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }
}

impl Detector for ReplayDetector {
    type Frame = usize;

    fn detect(&mut self, frame: &usize) -> Option<BoundingBox> {
        self.frames.get(*frame).copied().flatten()
    }
}

/// Drive every frame through `pipeline`, in order.
pub fn run(
    pipeline: &mut Pipeline,
    detector: &mut ReplayDetector,
) -> Vec<(usize, Option<FrameOutcome>)> {
    (0..detector.len())
        .map(|index| (index, pipeline.process_frame(detector, &index)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use dropwatch_alert::{AlertMachine, AlertState, LogAlarm, PipelineConfig, TriggerGateway};
    use dropwatch_notify::{DispatchPool, FanOut, FanOutPlan, LogTransport};
    use dropwatch_tracking::{DirectionEvent, Measurement};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_parse_frames() {
        let frames = parse_frames("# header\n50,100\n\n-\n40, 90, 60, 110\n").unwrap();

        assert_eq!(frames.len(), 4);
        assert_eq!(frames[0].unwrap().centroid(), Measurement::new(50.0, 100.0));
        assert!(frames[1].is_none());
        assert!(frames[2].is_none());
        assert_eq!(frames[3].unwrap().centroid(), Measurement::new(50.0, 100.0));
    }

    #[test]
    fn test_parse_errors_report_line() {
        let err = parse_frames("50,100\n1,2,3\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("expected 2 or 4 values"));

        let err = parse_frames("# c\nfifty,100\n").unwrap_err();
        assert_eq!(err.line, 2);
        assert!(err.message.contains("invalid number"));
    }

    #[tokio::test]
    async fn test_run_replays_fall_and_rise() {
        let fan_out = FanOut::new(Arc::new(LogTransport), DispatchPool::new(2));
        let plan = FanOutPlan::new(Vec::new(), 1, Duration::ZERO);
        let gateway = Arc::new(TriggerGateway::new(fan_out, plan).unwrap());
        let machine = AlertMachine::new(Arc::clone(&gateway), Arc::new(LogAlarm::new()));
        let mut pipeline = Pipeline::new(PipelineConfig::default(), machine);

        let frames = parse_frames("50,100\n-\n50,120\n50,90\n").unwrap();
        let mut detector = ReplayDetector::new(frames);
        let records = run(&mut pipeline, &mut detector);

        let events: Vec<_> = records
            .iter()
            .map(|(_, outcome)| outcome.map(|o| o.event))
            .collect();
        assert_eq!(
            events,
            vec![
                Some(DirectionEvent::Unknown),
                None,
                Some(DirectionEvent::Descending),
                Some(DirectionEvent::Ascending),
            ]
        );
        assert_eq!(gateway.status(), AlertState::Idle);
        assert_eq!(gateway.snapshot().activations, 1);
        assert_eq!(pipeline.stats().missed, 1);
        gateway.drain().await;
    }
}
