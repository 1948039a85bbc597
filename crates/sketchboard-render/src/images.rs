//! Off-thread decoding of embedded image payloads.
//!
//! Each distinct source is decoded once, in request order, on a single
//! background worker. Until the result arrives the image is simply absent
//! from rendered output; a failed decode stays failed while its source is
//! still cached. [`ImageCache::retain_sources`] drops entries whose action
//! left the history.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};
use std::thread::{self, JoinHandle};
use thiserror::Error;

/// Image decoding errors.
#[derive(Debug, Error)]
pub enum ImageError {
    #[error("Not a data URI")]
    NotDataUri,
    #[error("Unsupported data URI encoding (expected base64)")]
    UnsupportedEncoding,
    #[error("Invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("Decode failed: {0}")]
    Decode(#[from] image::ImageError),
    #[error("Decode worker stopped")]
    WorkerGone,
}

/// A decoded image as straight RGBA8 pixels.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedImage {
    pub width: u32,
    pub height: u32,
    pub pixels: Arc<Vec<u8>>,
}

/// Decode a `data:<mime>;base64,<payload>` URI.
pub fn decode_data_uri(source: &str) -> Result<DecodedImage, ImageError> {
    let rest = source.strip_prefix("data:").ok_or(ImageError::NotDataUri)?;
    let (header, payload) = rest.split_once(',').ok_or(ImageError::NotDataUri)?;
    if !header.split(';').any(|part| part.eq_ignore_ascii_case("base64")) {
        return Err(ImageError::UnsupportedEncoding);
    }
    let bytes = STANDARD.decode(payload.trim())?;
    let rgba = image::load_from_memory(&bytes)?.to_rgba8();
    let (width, height) = rgba.dimensions();
    Ok(DecodedImage {
        width,
        height,
        pixels: Arc::new(rgba.into_raw()),
    })
}

/// Worker body: decode sources in order until the cache hangs up.
fn decode_worker(jobs: &Receiver<String>, results: &Sender<DecodeResult>) {
    for source in jobs {
        let result = decode_data_uri(&source);
        if results.send((source, result)).is_err() {
            break;
        }
    }
    log::debug!("Image decode worker exiting");
}

/// Lookup result for an image source.
#[derive(Debug, Clone, PartialEq)]
pub enum ImageStatus {
    Pending,
    Ready(Arc<DecodedImage>),
    Failed,
}

type DecodeResult = (String, Result<DecodedImage, ImageError>);

/// Cache of decoded images keyed by their source string.
pub struct ImageCache {
    entries: HashMap<String, ImageStatus>,
    job_tx: Option<Sender<String>>,
    result_tx: Sender<DecodeResult>,
    result_rx: Receiver<DecodeResult>,
    _worker: Option<JoinHandle<()>>,
}

impl Default for ImageCache {
    fn default() -> Self {
        Self::new()
    }
}

impl ImageCache {
    pub fn new() -> Self {
        let (result_tx, result_rx) = channel();
        Self {
            entries: HashMap::new(),
            job_tx: None,
            result_tx,
            result_rx,
            _worker: None,
        }
    }

    /// Queue a decode, starting the worker on first use.
    fn submit(&mut self, source: String) {
        if self.job_tx.is_none() {
            let (job_tx, job_rx) = channel::<String>();
            let result_tx = self.result_tx.clone();
            self._worker = Some(thread::spawn(move || decode_worker(&job_rx, &result_tx)));
            self.job_tx = Some(job_tx);
        }
        let Some(job_tx) = &self.job_tx else {
            return;
        };
        if let Err(e) = job_tx.send(source) {
            log::error!("Image decode worker is gone");
            let _ = self.result_tx.send((e.0, Err(ImageError::WorkerGone)));
            self.job_tx = None;
        }
    }

    /// Current status for `source`, starting a decode on first sight.
    pub fn get_or_request(&mut self, source: &str) -> ImageStatus {
        if let Some(status) = self.entries.get(source) {
            return status.clone();
        }
        self.entries
            .insert(source.to_string(), ImageStatus::Pending);
        self.submit(source.to_string());
        ImageStatus::Pending
    }

    /// Forget every source not in `live`.
    ///
    /// Decodes still in flight for a dropped source are discarded on arrival.
    pub fn retain_sources<'a>(&mut self, live: impl IntoIterator<Item = &'a str>) {
        let live: HashSet<&str> = live.into_iter().collect();
        let before = self.entries.len();
        self.entries.retain(|source, _| live.contains(source.as_str()));
        let evicted = before - self.entries.len();
        if evicted > 0 {
            log::debug!("Evicted {} unused images", evicted);
        }
    }

    /// Collect finished decodes. Returns true if any image became ready.
    pub fn poll(&mut self) -> bool {
        let mut ready = false;
        while let Ok((key, result)) = self.result_rx.try_recv() {
            let Some(slot) = self.entries.get_mut(&key) else {
                log::debug!("Dropping decode for evicted image");
                continue;
            };
            *slot = match result {
                Ok(image) => {
                    log::debug!("Decoded image {}x{}", image.width, image.height);
                    ready = true;
                    ImageStatus::Ready(Arc::new(image))
                }
                Err(e) => {
                    log::warn!("Image decode failed: {}", e);
                    ImageStatus::Failed
                }
            };
        }
        ready
    }

    /// Number of decodes still in flight.
    pub fn pending(&self) -> usize {
        self.entries
            .values()
            .filter(|s| matches!(s, ImageStatus::Pending))
            .count()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
