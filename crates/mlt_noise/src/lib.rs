//! # mlt_noise - Sample Service Module
//!
//! A loadable module registering the `noise` producer. Build it as a
//! `cdylib` and drop the library into the repository directory.
//!
//! The producer fills a pseudo-random buffer. When created with an input
//! path it writes `dropped` to that path when it is dropped.

use mlt_repository::{declare_module, Repository};
use mlt_service::prelude::*;
use std::any::Any;
use std::path::PathBuf;

/// Bytes of noise generated per producer
const NOISE_BYTES: usize = 4096;

/// The `noise` producer
pub struct Noise {
    properties: Properties,
    samples: Vec<u8>,
    drop_marker: Option<PathBuf>,
}

impl Noise {
    fn new(input: Option<&str>) -> Self {
        let mut seed: u32 = 0x9e37_79b9;
        let samples = (0..NOISE_BYTES)
            .map(|_| {
                seed ^= seed << 13;
                seed ^= seed >> 17;
                seed ^= seed << 5;
                seed as u8
            })
            .collect();

        let mut properties = Properties::new();
        if let Some(input) = input {
            properties.set("resource", input);
        }

        Self {
            properties,
            samples,
            drop_marker: input.map(PathBuf::from),
        }
    }

    /// Generated samples
    pub fn samples(&self) -> &[u8] {
        &self.samples
    }
}

impl Service for Noise {
    fn properties(&self) -> &Properties {
        &self.properties
    }

    fn properties_mut(&mut self) -> &mut Properties {
        &mut self.properties
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

impl Drop for Noise {
    fn drop(&mut self) {
        if let Some(path) = self.drop_marker.take() {
            let _ = std::fs::write(path, b"dropped");
        }
    }
}

fn register(repository: &mut Repository) {
    repository.register(ServiceType::Producer, "noise", |_, _, _, input| {
        let noise: Box<dyn Service> = Box::new(Noise::new(input));
        Some(noise)
    });
}

declare_module!(register);
