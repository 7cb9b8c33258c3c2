//! Camera frame acquisition.
//!
//! Frames for motion analysis come out of a GStreamer pipeline
//! (`v4l2src … ! appsink`) scaled to the analysis width and converted to
//! GRAY8. The pipeline holds the device open, so it must be torn down to
//! Null before the external recorder can take the camera.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use camwatch_common::error::{CamwatchError, CamwatchResult};
use gst::prelude::*;
use gstreamer as gst;
use gstreamer_app as gst_app;
use image::GrayImage;

/// How long a single frame pull may take before the source is considered
/// stalled.
const READ_TIMEOUT_SECS: u64 = 10;

/// Trait for a source of grayscale analysis frames.
///
/// A source is a lazy, potentially infinite sequence of frames; `read`
/// returning `Ok(None)` means the stream ended (not an error).
pub trait FrameSource: Send {
    /// Read the next frame, blocking until one is available.
    fn read(&mut self) -> CamwatchResult<Option<GrayImage>>;

    /// Release the underlying device completely.
    fn close(&mut self) -> CamwatchResult<()>;

    /// Source name for logging.
    fn name(&self) -> &str;
}

/// Trait for acquiring a fresh frame source.
pub trait SourceOpener: Send {
    fn open(&mut self) -> CamwatchResult<Box<dyn FrameSource>>;
}

/// A frame source backed by a GStreamer appsink pipeline.
pub struct GstFrameSource {
    pipeline: gst::Pipeline,
    appsink: gst_app::AppSink,
    closed: bool,
}

impl GstFrameSource {
    /// Open the device and bring the pipeline to Playing.
    pub fn open(device: &Path, width: u32) -> CamwatchResult<Self> {
        init_gstreamer()?;

        let device = escape_path(device);
        let launch = format!(
            "v4l2src device=\"{device}\" ! videoconvert ! videoscale ! video/x-raw,format=GRAY8,width={width} ! appsink name=frames max-buffers=2 drop=true sync=false"
        );

        let element = gst::parse::launch(&launch)
            .map_err(|e| CamwatchError::capture(format!("Failed to build source pipeline: {e}")))?;
        let pipeline = element
            .dynamic_cast::<gst::Pipeline>()
            .map_err(|_| CamwatchError::capture("Launch string did not produce a pipeline"))?;
        let appsink = pipeline
            .by_name("frames")
            .ok_or_else(|| CamwatchError::capture("Source pipeline has no appsink"))?
            .dynamic_cast::<gst_app::AppSink>()
            .map_err(|_| CamwatchError::capture("Element 'frames' is not an appsink"))?;

        pipeline
            .set_state(gst::State::Playing)
            .map_err(|e| CamwatchError::capture(format!("Failed to start source pipeline: {e:?}")))?;

        // GStreamer state changes are async; wait until the device is
        // actually open before declaring the session usable.
        match pipeline.state(gst::ClockTime::from_seconds(10)) {
            (Ok(_), gst::State::Playing, _) => {}
            (Ok(_), state, _) => {
                tracing::warn!(?state, "Source pipeline did not reach Playing state within timeout");
            }
            (Err(e), _, _) => {
                let _ = pipeline.set_state(gst::State::Null);
                return Err(CamwatchError::capture(format!(
                    "Source pipeline failed to reach Playing state: {e:?}"
                )));
            }
        }

        Ok(Self {
            pipeline,
            appsink,
            closed: false,
        })
    }

    fn frame_from_sample(&self, sample: &gst::Sample) -> CamwatchResult<GrayImage> {
        let caps = sample
            .caps()
            .ok_or_else(|| CamwatchError::capture("Sample carries no caps"))?;
        let structure = caps
            .structure(0)
            .ok_or_else(|| CamwatchError::capture("Sample caps are empty"))?;
        let width = structure
            .get::<i32>("width")
            .map_err(|e| CamwatchError::capture(format!("Sample caps missing width: {e}")))?
            as u32;
        let height = structure
            .get::<i32>("height")
            .map_err(|e| CamwatchError::capture(format!("Sample caps missing height: {e}")))?
            as u32;

        let buffer = sample
            .buffer()
            .ok_or_else(|| CamwatchError::capture("Sample carries no buffer"))?;
        let map = buffer
            .map_readable()
            .map_err(|e| CamwatchError::capture(format!("Failed to map frame buffer: {e}")))?;
        let data = map.as_slice();

        if height == 0 || data.len() < (width * height) as usize {
            return Err(CamwatchError::capture(format!(
                "Frame buffer too small: {} bytes for {width}x{height}",
                data.len()
            )));
        }

        // GRAY8 rows may carry alignment padding; copy row by row.
        let stride = data.len() / height as usize;
        let mut pixels = Vec::with_capacity((width * height) as usize);
        for row in 0..height as usize {
            let start = row * stride;
            pixels.extend_from_slice(&data[start..start + width as usize]);
        }

        GrayImage::from_raw(width, height, pixels)
            .ok_or_else(|| CamwatchError::capture("Frame buffer size mismatch"))
    }
}

impl FrameSource for GstFrameSource {
    fn read(&mut self) -> CamwatchResult<Option<GrayImage>> {
        if self.closed {
            return Ok(None);
        }
        match self
            .appsink
            .try_pull_sample(gst::ClockTime::from_seconds(READ_TIMEOUT_SECS))
        {
            Some(sample) => self.frame_from_sample(&sample).map(Some),
            None => {
                if self.appsink.is_eos() {
                    Ok(None)
                } else {
                    Err(CamwatchError::capture("Timed out waiting for a frame"))
                }
            }
        }
    }

    fn close(&mut self) -> CamwatchResult<()> {
        if self.closed {
            return Ok(());
        }
        self.pipeline
            .set_state(gst::State::Null)
            .map_err(|e| CamwatchError::capture(format!("Failed to stop source pipeline: {e:?}")))?;
        self.closed = true;
        Ok(())
    }

    fn name(&self) -> &str {
        "v4l2"
    }
}

impl Drop for GstFrameSource {
    fn drop(&mut self) {
        if !self.closed {
            let _ = self.pipeline.set_state(gst::State::Null);
        }
    }
}

/// Opens [`GstFrameSource`] sessions for a fixed device.
pub struct GstSourceOpener {
    device: PathBuf,
    width: u32,
}

impl GstSourceOpener {
    pub fn new(device: impl Into<PathBuf>, width: u32) -> Self {
        Self {
            device: device.into(),
            width,
        }
    }
}

impl SourceOpener for GstSourceOpener {
    fn open(&mut self) -> CamwatchResult<Box<dyn FrameSource>> {
        Ok(Box::new(GstFrameSource::open(&self.device, self.width)?))
    }
}

/// Whether GStreamer can be initialized on this system.
pub fn gst_available() -> bool {
    init_gstreamer().is_ok()
}

fn init_gstreamer() -> CamwatchResult<()> {
    static GST_INIT: OnceLock<Result<(), String>> = OnceLock::new();
    let init_res = GST_INIT.get_or_init(|| gst::init().map_err(|e| e.to_string()));
    match init_res {
        Ok(()) => Ok(()),
        Err(e) => Err(CamwatchError::capture(format!(
            "Failed to initialize GStreamer: {e}"
        ))),
    }
}

fn escape_path(path: &Path) -> String {
    path.to_string_lossy().replace('"', "\\\"")
}
