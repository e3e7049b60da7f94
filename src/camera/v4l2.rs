//! V4L2 camera backend (Linux, `v4l2` feature)
//!
//! Requests MJPG so frames pass through without re-encoding; falls back
//! to YUYV with a software conversion when the driver refuses. Device
//! nodes are enumerated from `/dev/video*`.

use crate::camera::{CameraBackend, CameraDevice, CameraSource, CapturedFrame};
use crate::config::CameraConfig;
use crate::error::{Error, Result};
use log::debug;
use v4l::buffer::Type;
use v4l::io::mmap::Stream as MmapStream;
use v4l::io::traits::CaptureStream;
use v4l::video::Capture;
use v4l::{Device, FourCC};

pub struct V4l2Backend {
    width: u32,
    height: u32,
}

impl V4l2Backend {
    pub fn from_config(config: &CameraConfig) -> Self {
        Self {
            width: config.width.max(1),
            height: config.height.max(1),
        }
    }
}

impl CameraBackend for V4l2Backend {
    fn open(&self, source: &CameraSource) -> Result<Box<dyn CameraDevice>> {
        Ok(Box::new(V4l2Camera::open(source, self.width, self.height)?))
    }

    fn device_nodes(&self) -> Vec<u32> {
        let mut nodes = Vec::new();
        if let Ok(entries) = std::fs::read_dir("/dev") {
            for entry in entries.flatten() {
                let name = entry.file_name();
                if let Some(rest) = name.to_string_lossy().strip_prefix("video") {
                    if let Ok(index) = rest.parse() {
                        nodes.push(index);
                    }
                }
            }
        }
        nodes.sort_unstable();
        nodes
    }

    fn name(&self) -> &'static str {
        "v4l2"
    }
}

enum PixelLayout {
    Mjpeg,
    Yuyv,
}

struct OpenStream {
    stream: MmapStream<'static>,
    layout: PixelLayout,
    width: u32,
    height: u32,
    fps: u32,
}

/// One V4L2 capture device
pub struct V4l2Camera {
    label: String,
    open: Option<OpenStream>,
}

impl V4l2Camera {
    fn open(source: &CameraSource, width: u32, height: u32) -> Result<Self> {
        let (device, label) = match source {
            CameraSource::Index(index) => (
                Device::new(*index as usize),
                format!("/dev/video{}", index),
            ),
            CameraSource::Path(path) => (Device::with_path(path), path.clone()),
        };
        let device = device.map_err(|e| {
            Error::HardwareUnavailable(format!("cannot open {}: {}", label, e))
        })?;

        let mut format = device
            .format()
            .map_err(|e| Error::HardwareUnavailable(format!("{}: {}", label, e)))?;
        format.width = width;
        format.height = height;
        format.fourcc = FourCC::new(b"MJPG");
        let mut actual = device
            .set_format(&format)
            .map_err(|e| Error::HardwareUnavailable(format!("{}: {}", label, e)))?;

        let layout = if actual.fourcc == FourCC::new(b"MJPG") {
            PixelLayout::Mjpeg
        } else {
            format.fourcc = FourCC::new(b"YUYV");
            actual = device
                .set_format(&format)
                .map_err(|e| Error::HardwareUnavailable(format!("{}: {}", label, e)))?;
            if actual.fourcc != FourCC::new(b"YUYV") {
                return Err(Error::HardwareUnavailable(format!(
                    "{} offers neither MJPG nor YUYV (got {})",
                    label, actual.fourcc
                )));
            }
            PixelLayout::Yuyv
        };

        let fps = device
            .params()
            .ok()
            .map(|params| {
                let interval = params.interval;
                if interval.numerator > 0 {
                    interval.denominator / interval.numerator
                } else {
                    0
                }
            })
            .unwrap_or(0);

        let stream = MmapStream::with_buffers(&device, Type::VideoCapture, 4)
            .map_err(|e| Error::HardwareUnavailable(format!("{}: {}", label, e)))?;

        debug!(
            "opened {} at {}x{} ({})",
            label,
            actual.width,
            actual.height,
            actual.fourcc
        );

        Ok(Self {
            label,
            open: Some(OpenStream {
                stream,
                layout,
                width: actual.width,
                height: actual.height,
                fps,
            }),
        })
    }
}

impl CameraDevice for V4l2Camera {
    fn is_open(&self) -> bool {
        self.open.is_some()
    }

    fn read_frame(&mut self) -> Result<CapturedFrame> {
        let open = self.open.as_mut().ok_or_else(|| {
            Error::CaptureFailed(format!("{} is closed", self.label))
        })?;

        let (data, meta) = open
            .stream
            .next()
            .map_err(|e| Error::CaptureFailed(format!("{}: {}", self.label, e)))?;
        let used = meta.bytesused as usize;
        let data = &data[..used.min(data.len())];

        match open.layout {
            PixelLayout::Mjpeg => Ok(CapturedFrame::Jpeg(data.to_vec())),
            PixelLayout::Yuyv => Ok(CapturedFrame::Rgb {
                width: open.width,
                height: open.height,
                pixels: yuyv_to_rgb(open.width, open.height, data),
            }),
        }
    }

    fn close(&mut self) {
        if self.open.take().is_some() {
            debug!("closed {}", self.label);
        }
    }

    fn width(&self) -> u32 {
        self.open.as_ref().map(|open| open.width).unwrap_or(0)
    }

    fn height(&self) -> u32 {
        self.open.as_ref().map(|open| open.height).unwrap_or(0)
    }

    fn fps(&self) -> u32 {
        self.open.as_ref().map(|open| open.fps).unwrap_or(0)
    }

    fn backend_name(&self) -> &'static str {
        "V4L2"
    }
}

/// BT.601 YUYV 4:2:2 to packed RGB8
fn yuyv_to_rgb(width: u32, height: u32, data: &[u8]) -> Vec<u8> {
    let pixel_count = (width * height) as usize;
    let mut rgb = Vec::with_capacity(pixel_count * 3);

    for chunk in data.chunks_exact(4) {
        let y0 = i32::from(chunk[0]);
        let u = i32::from(chunk[1]) - 128;
        let y1 = i32::from(chunk[2]);
        let v = i32::from(chunk[3]) - 128;

        for y in [y0, y1] {
            let c = 298 * (y - 16);
            let r = (c + 409 * v + 128) >> 8;
            let g = (c - 100 * u - 208 * v + 128) >> 8;
            let b = (c + 516 * u + 128) >> 8;
            rgb.push(r.clamp(0, 255) as u8);
            rgb.push(g.clamp(0, 255) as u8);
            rgb.push(b.clamp(0, 255) as u8);
        }
    }

    rgb.resize(pixel_count * 3, 0);
    rgb
}
