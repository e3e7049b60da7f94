//! Simulated camera backend
//!
//! Synthesizes a moving test pattern for a configurable set of camera
//! ids. Frames come back as raw RGB and get JPEG encoded by the registry,
//! exercising the same path a raw-frame hardware backend would take.

use crate::camera::{CameraBackend, CameraDevice, CameraSource, CapturedFrame};
use crate::config::CameraConfig;
use crate::error::{Error, Result};
use log::debug;
use rand::Rng;
use std::collections::BTreeSet;

/// Height of the moving highlight band in rows
const BAND_ROWS: usize = 12;

pub struct SimulatedCameraBackend {
    present: BTreeSet<u32>,
    width: u32,
    height: u32,
}

impl SimulatedCameraBackend {
    /// Backend exposing the ids listed in the camera config
    ///
    /// Non-numeric ids in the list are ignored. Zero dimensions are
    /// raised to 1 so frame synthesis never divides by zero.
    pub fn from_config(config: &CameraConfig) -> Self {
        let present = config
            .sim_devices
            .iter()
            .filter_map(|id| id.parse().ok())
            .collect();
        Self {
            present,
            width: config.width.max(1),
            height: config.height.max(1),
        }
    }

    /// Backend exposing exactly the given indices
    pub fn with_devices(indices: &[u32], width: u32, height: u32) -> Self {
        Self {
            present: indices.iter().copied().collect(),
            width,
            height,
        }
    }
}

impl CameraBackend for SimulatedCameraBackend {
    fn open(&self, source: &CameraSource) -> Result<Box<dyn CameraDevice>> {
        match source {
            CameraSource::Index(index) if self.present.contains(index) => Ok(Box::new(
                SimulatedCamera::new(*index, self.width, self.height),
            )),
            CameraSource::Index(index) => Err(Error::HardwareUnavailable(format!(
                "no simulated camera at index {}",
                index
            ))),
            CameraSource::Path(path) => Err(Error::HardwareUnavailable(format!(
                "no simulated camera at {}",
                path
            ))),
        }
    }

    fn device_nodes(&self) -> Vec<u32> {
        self.present.iter().copied().collect()
    }

    fn name(&self) -> &'static str {
        "simulated"
    }
}

/// Synthetic camera producing a moving test pattern
pub struct SimulatedCamera {
    index: u32,
    width: u32,
    height: u32,
    open: bool,
    frame_counter: u64,
}

impl SimulatedCamera {
    pub fn new(index: u32, width: u32, height: u32) -> Self {
        debug!("simulated camera {} opened", index);
        Self {
            index,
            width,
            height,
            open: true,
            frame_counter: 0,
        }
    }
}

impl CameraDevice for SimulatedCamera {
    fn is_open(&self) -> bool {
        self.open
    }

    fn read_frame(&mut self) -> Result<CapturedFrame> {
        if !self.open {
            return Err(Error::CaptureFailed("device is closed".to_string()));
        }
        self.frame_counter += 1;

        let width = self.width as usize;
        let height = self.height as usize;
        let mut pixels = vec![0u8; width * height * 3];
        let band_top = (self.frame_counter as usize * 4) % height;
        let mut rng = rand::thread_rng();

        for y in 0..height {
            let in_band = (y + height - band_top) % height < BAND_ROWS;
            for x in 0..width {
                let i = (y * width + x) * 3;
                if in_band {
                    // Noisy bright band so consecutive frames differ
                    let v = 215 + rng.gen_range(0..40u8);
                    pixels[i] = v;
                    pixels[i + 1] = v;
                    pixels[i + 2] = v;
                } else {
                    pixels[i] = (x * 255 / width) as u8;
                    pixels[i + 1] = (y * 255 / height) as u8;
                    pixels[i + 2] = 64;
                }
            }
        }

        Ok(CapturedFrame::Rgb {
            width: self.width,
            height: self.height,
            pixels,
        })
    }

    fn close(&mut self) {
        if self.open {
            debug!("simulated camera {} closed", self.index);
        }
        self.open = false;
    }

    fn width(&self) -> u32 {
        self.width
    }

    fn height(&self) -> u32 {
        self.height
    }

    fn fps(&self) -> u32 {
        20
    }

    fn backend_name(&self) -> &'static str {
        "SIM"
    }
}
