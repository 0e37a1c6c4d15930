//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! [`render`] is shared with the diagnostic journal so both carry the same
//! tagged lines.

use log::{log, Level};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;
use crate::motion::{AxisKind, AxisSample};

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        for (level, line) in render(event) {
            log!(level, "{line}");
        }
    }
}

fn axis_fields(sample: &AxisSample) -> String {
    format!(
        "degrees={:.4}, steps={:.3}, target={}",
        sample.degrees, sample.exact_steps, sample.target
    )
}

/// Tagged log lines for one event.  A sample that moved an axis also
/// yields one `MOVE` line per moving axis.
pub fn render(event: &AppEvent) -> Vec<(Level, String)> {
    match event {
        AppEvent::Started {
            steps_per_revolution,
        } => vec![(
            Level::Info,
            format!("START | steps_per_revolution={steps_per_revolution}"),
        )],
        AppEvent::Calibrated { axis, report } => vec![(
            Level::Info,
            format!(
                "CAL | {axis} homed | back_off={} seek={} clear={} center={}",
                report.back_off_steps, report.seek_steps, report.clear_steps, report.center_steps
            ),
        )],
        AppEvent::CalibrationFailed {
            axis,
            attempt,
            error,
        } => vec![(
            Level::Error,
            format!("CAL | {axis} attempt {attempt} failed: {error}"),
        )],
        AppEvent::Sample { time, report } => {
            let mut lines = vec![(
                Level::Info,
                format!(
                    "SAMPLE | {time} | orbit[{}] rotation[{}] | effective={:.4}",
                    axis_fields(&report.orbit),
                    axis_fields(&report.rotation),
                    report.model.effective_degrees(),
                ),
            )];
            for kind in AxisKind::ALL {
                let s = report.axis(kind);
                if s.issued > 0 {
                    lines.push((
                        Level::Info,
                        format!(
                            "MOVE | {kind} {} {}/{} steps -> {}",
                            s.planned.direction, s.issued, s.planned.steps, s.position
                        ),
                    ));
                }
            }
            lines
        }
        AppEvent::Fault(e) => vec![(Level::Warn, format!("FAULT | {e}"))],
        AppEvent::Fatal(e) => vec![(Level::Error, format!("FATAL | {e}"))],
    }
}
