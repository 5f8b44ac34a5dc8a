use crate::error::PreviewError;
use std::time::Duration;
use tracing::{error, info, warn};

/// Where frames come from. Dropping the source releases the device.
pub trait FrameSource {
    type Frame;

    /// Next frame, or `None` once the device stops delivering frames.
    fn read_frame(&mut self) -> Result<Option<Self::Frame>, PreviewError>;
}

/// Where frames go. Dropping the sink releases its display resources.
pub trait FrameSink<F> {
    fn render(&mut self, frame: &F) -> Result<(), PreviewError>;

    /// Wait up to `interval` for a key press.
    fn poll_key(&mut self, interval: Duration) -> Result<Option<char>, PreviewError>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct PreviewConfig {
    pub device_index: i32,
    pub window_title: String,
    pub quit_key: char,
    pub poll_interval: Duration,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            device_index: 0,
            window_title: String::from("Webcam Test"),
            quit_key: 'q',
            poll_interval: Duration::from_millis(1),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CloseReason {
    QuitRequested,
    FrameReadFailed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PreviewState {
    Streaming,
    Closed(CloseReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewSummary {
    pub frames_rendered: usize,
    pub reason: CloseReason,
}

/// Open the device with `open` and show its frames on `sink` until the quit
/// key is pressed or a read fails.
///
/// The source and sink are owned here, so both are released on every return
/// path, including errors.
pub fn run_preview<S, W, O>(
    config: &PreviewConfig,
    open: O,
    mut sink: W,
) -> Result<PreviewSummary, PreviewError>
where
    S: FrameSource,
    W: FrameSink<S::Frame>,
    O: FnOnce(i32) -> Result<S, PreviewError>,
{
    info!("Attempting to open webcam...");
    let mut source = open(config.device_index)?;
    info!(
        "Webcam opened successfully! Press '{}' to quit.",
        config.quit_key
    );

    let mut state = PreviewState::Streaming;
    let mut frames_rendered = 0;
    loop {
        state = match state {
            PreviewState::Streaming => {
                step(config, &mut source, &mut sink, &mut frames_rendered)?
            }
            PreviewState::Closed(reason) => {
                drop(source);
                drop(sink);
                info!("Webcam test finished.");
                return Ok(PreviewSummary {
                    frames_rendered,
                    reason,
                });
            }
        };
    }
}

fn step<S, W>(
    config: &PreviewConfig,
    source: &mut S,
    sink: &mut W,
    frames_rendered: &mut usize,
) -> Result<PreviewState, PreviewError>
where
    S: FrameSource,
    W: FrameSink<S::Frame>,
{
    let frame = match source.read_frame() {
        Ok(Some(frame)) => frame,
        Ok(None) => {
            warn!("Failed to grab frame.");
            return Ok(PreviewState::Closed(CloseReason::FrameReadFailed));
        }
        Err(err) => {
            warn!("Failed to grab frame: {}", err);
            return Ok(PreviewState::Closed(CloseReason::FrameReadFailed));
        }
    };

    sink.render(&frame)?;
    *frames_rendered += 1;

    if sink.poll_key(config.poll_interval)? == Some(config.quit_key) {
        return Ok(PreviewState::Closed(CloseReason::QuitRequested));
    }
    Ok(PreviewState::Streaming)
}

/// Process exit status for a preview run. Failures are logged here.
pub fn exit_code(result: &Result<PreviewSummary, PreviewError>) -> u8 {
    match result {
        Ok(_) => 0,
        Err(PreviewError::DeviceUnavailable { index }) => {
            error!("Error: Could not open webcam {index}. This might trigger the camera permission prompt.");
            error!("Please check the camera privacy settings of your system.");
            1
        }
        Err(err) => {
            error!("Error: {}", err);
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use std::rc::Rc;

    #[derive(Default)]
    struct Log {
        rendered: Vec<u32>,
        source_released: bool,
        sink_released: bool,
    }

    struct ScriptedSource {
        frames: VecDeque<u32>,
        log: Rc<RefCell<Log>>,
    }

    impl FrameSource for ScriptedSource {
        type Frame = u32;

        fn read_frame(&mut self) -> Result<Option<u32>, PreviewError> {
            Ok(self.frames.pop_front())
        }
    }

    impl Drop for ScriptedSource {
        fn drop(&mut self) {
            self.log.borrow_mut().source_released = true;
        }
    }

    struct RecordingSink {
        keys: VecDeque<Option<char>>,
        log: Rc<RefCell<Log>>,
    }

    impl FrameSink<u32> for RecordingSink {
        fn render(&mut self, frame: &u32) -> Result<(), PreviewError> {
            self.log.borrow_mut().rendered.push(*frame);
            Ok(())
        }

        fn poll_key(&mut self, _interval: Duration) -> Result<Option<char>, PreviewError> {
            Ok(self.keys.pop_front().flatten())
        }
    }

    impl Drop for RecordingSink {
        fn drop(&mut self) {
            self.log.borrow_mut().sink_released = true;
        }
    }

    fn sink(keys: Vec<Option<char>>, log: &Rc<RefCell<Log>>) -> RecordingSink {
        RecordingSink {
            keys: keys.into(),
            log: log.clone(),
        }
    }

    #[test]
    fn stops_after_failed_read() {
        let log = Rc::new(RefCell::new(Log::default()));
        let source_log = log.clone();
        let result = run_preview(
            &PreviewConfig::default(),
            move |_| {
                Ok(ScriptedSource {
                    frames: vec![1, 2, 3].into(),
                    log: source_log,
                })
            },
            sink(vec![], &log),
        );

        assert_eq!(
            result.as_ref().unwrap(),
            &PreviewSummary {
                frames_rendered: 3,
                reason: CloseReason::FrameReadFailed
            }
        );
        assert_eq!(exit_code(&result), 0);
        let log = log.borrow();
        assert_eq!(log.rendered, vec![1, 2, 3]);
        assert!(log.source_released);
        assert!(log.sink_released);
    }

    #[test]
    fn quit_key_ends_loop() {
        let log = Rc::new(RefCell::new(Log::default()));
        let source_log = log.clone();
        let result = run_preview(
            &PreviewConfig::default(),
            move |_| {
                Ok(ScriptedSource {
                    frames: vec![1, 2, 3, 4].into(),
                    log: source_log,
                })
            },
            sink(vec![None, Some('x'), Some('q')], &log),
        )
        .unwrap();

        assert_eq!(result.reason, CloseReason::QuitRequested);
        assert_eq!(result.frames_rendered, 3);
        assert!(log.borrow().source_released);
    }

    struct DisconnectingSource {
        remaining: u32,
    }

    impl FrameSource for DisconnectingSource {
        type Frame = u32;

        fn read_frame(&mut self) -> Result<Option<u32>, PreviewError> {
            if self.remaining == 0 {
                return Err(PreviewError::Display(String::from("device lost")));
            }
            self.remaining -= 1;
            Ok(Some(self.remaining))
        }
    }

    #[test]
    fn read_error_closes_gracefully() {
        let log = Rc::new(RefCell::new(Log::default()));
        let result = run_preview(
            &PreviewConfig::default(),
            |_| Ok(DisconnectingSource { remaining: 2 }),
            sink(vec![], &log),
        );

        assert_eq!(
            result.unwrap(),
            PreviewSummary {
                frames_rendered: 2,
                reason: CloseReason::FrameReadFailed
            }
        );
        assert_eq!(log.borrow().rendered, vec![1, 0]);
    }

    #[test]
    fn open_failure_renders_nothing() {
        let log = Rc::new(RefCell::new(Log::default()));
        let config = PreviewConfig {
            device_index: 2,
            ..Default::default()
        };
        let result = run_preview::<ScriptedSource, _, _>(
            &config,
            |index| Err(PreviewError::DeviceUnavailable { index }),
            sink(vec![], &log),
        );

        assert!(matches!(
            result,
            Err(PreviewError::DeviceUnavailable { index: 2 })
        ));
        assert_eq!(exit_code(&result), 1);
        let log = log.borrow();
        assert!(log.rendered.is_empty());
        assert!(log.sink_released);
    }
}
