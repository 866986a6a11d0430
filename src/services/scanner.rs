//! Barcode scanner adapter: camera acquisition, pluggable decoding and a
//! manual-entry fallback

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use once_cell::sync::Lazy;
use rand::{rngs::StdRng, Rng, SeedableRng};
use regex::Regex;
use thiserror::Error;
use tokio::sync::RwLock;

use crate::{
    config::{CameraKind, DecoderKind, ScannerConfig},
    error::{AppError, AppResult},
    models::scan::{BarcodeFormat, ScanOutcome, ScanRecord, ScanSource},
    repository::Repository,
    services::catalog::{view, CatalogService},
};

static ISBN13: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{13}$").expect("valid regex"));
static ISBN10: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d{9}[\dX]$").expect("valid regex"));

/// Why the camera could not be opened
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CameraError {
    #[error("Camera permission denied. Please allow camera access and try again.")]
    PermissionDenied,
    #[error("No camera device found. Please connect a camera.")]
    NoDevice,
    #[error("Camera is already in use by another application.")]
    InUse,
    #[error("Camera constraints cannot be satisfied by available devices.")]
    ConstraintsUnsatisfiable,
    #[error("Failed to access camera. Please check your device settings.")]
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScanError {
    #[error("{0}")]
    Camera(#[from] CameraError),
    #[error("No barcode detected within {0:?}")]
    Timeout(Duration),
    #[error("Please enter a barcode")]
    EmptyCode,
}

impl From<ScanError> for AppError {
    fn from(err: ScanError) -> Self {
        match err {
            ScanError::EmptyCode => AppError::Validation(err.to_string()),
            other => AppError::BadRequest(format!("{} Enter the barcode manually instead.", other)),
        }
    }
}

/// One captured frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Frame {
    pub index: u64,
}

/// Open capture handle. Dropping it releases the device.
pub trait CameraStream: Send {
    fn next_frame(&mut self) -> Option<Frame>;
}

pub trait Camera: Send + Sync {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError>;
}

/// Camera producing blank frames. Only one stream may be open at a time.
#[derive(Debug, Clone, Default)]
pub struct SyntheticCamera {
    open_streams: Arc<AtomicUsize>,
}

impl SyntheticCamera {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of streams currently holding the device
    pub fn open_streams(&self) -> usize {
        self.open_streams.load(Ordering::SeqCst)
    }
}

impl Camera for SyntheticCamera {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        self.open_streams
            .compare_exchange(0, 1, Ordering::SeqCst, Ordering::SeqCst)
            .map_err(|_| CameraError::InUse)?;

        Ok(Box::new(SyntheticStream {
            next: 0,
            open_streams: self.open_streams.clone(),
        }))
    }
}

struct SyntheticStream {
    next: u64,
    open_streams: Arc<AtomicUsize>,
}

impl CameraStream for SyntheticStream {
    fn next_frame(&mut self) -> Option<Frame> {
        let frame = Frame { index: self.next };
        self.next += 1;
        Some(frame)
    }
}

impl Drop for SyntheticStream {
    fn drop(&mut self) {
        self.open_streams.fetch_sub(1, Ordering::SeqCst);
        tracing::debug!("Camera stream released after {} frame(s)", self.next);
    }
}

/// Host without a usable camera
#[derive(Debug, Clone, Copy)]
pub struct UnavailableCamera(pub CameraError);

impl Camera for UnavailableCamera {
    fn open(&self) -> Result<Box<dyn CameraStream>, CameraError> {
        Err(self.0)
    }
}

/// Turns frames into barcode strings
pub trait BarcodeDecoder: Send {
    fn decode(&mut self, frame: &Frame) -> Option<String>;
}

/// Reports a random sample code with a small chance per frame
pub struct SimulatedDecoder {
    rng: StdRng,
    probability: f64,
    samples: Vec<String>,
}

impl SimulatedDecoder {
    pub fn new(rng: StdRng, probability: f64, samples: Vec<String>) -> Self {
        Self {
            rng,
            probability: if probability.is_finite() {
                probability.clamp(0.0, 1.0)
            } else {
                0.0
            },
            samples,
        }
    }
}

impl BarcodeDecoder for SimulatedDecoder {
    fn decode(&mut self, _frame: &Frame) -> Option<String> {
        if self.samples.is_empty() || !self.rng.gen_bool(self.probability) {
            return None;
        }
        let pick = self.rng.gen_range(0..self.samples.len());
        Some(self.samples[pick].clone())
    }
}

/// Replays a fixed script, one entry per frame
#[derive(Debug, Clone, Default)]
pub struct FixtureDecoder {
    script: VecDeque<Option<String>>,
}

impl FixtureDecoder {
    pub fn new(script: impl IntoIterator<Item = Option<String>>) -> Self {
        Self {
            script: script.into_iter().collect(),
        }
    }

    /// Every frame yields the next code until the list runs out
    pub fn from_codes(codes: &[String]) -> Self {
        Self::new(codes.iter().cloned().map(Some))
    }
}

impl BarcodeDecoder for FixtureDecoder {
    fn decode(&mut self, _frame: &Frame) -> Option<String> {
        self.script.pop_front().flatten()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScannerState {
    Idle,
    RequestingCamera,
    Streaming,
    Detected(String),
    Error(CameraError),
}

pub type DetectionHook = Arc<dyn Fn(&str) + Send + Sync>;

/// Single-use scanning session owning the camera while streaming
pub struct BarcodeScanner {
    camera: Arc<dyn Camera>,
    decoder: Box<dyn BarcodeDecoder>,
    stream: Option<Box<dyn CameraStream>>,
    state: ScannerState,
    last_emitted: Option<String>,
    on_detect: Option<DetectionHook>,
}

impl BarcodeScanner {
    pub fn new(camera: Arc<dyn Camera>, decoder: Box<dyn BarcodeDecoder>) -> Self {
        Self {
            camera,
            decoder,
            stream: None,
            state: ScannerState::Idle,
            last_emitted: None,
            on_detect: None,
        }
    }

    /// Called with every emitted code (haptic feedback and the like)
    pub fn with_detection_hook(mut self, hook: DetectionHook) -> Self {
        self.on_detect = Some(hook);
        self
    }

    pub fn state(&self) -> &ScannerState {
        &self.state
    }

    pub fn is_streaming(&self) -> bool {
        self.stream.is_some()
    }

    /// Acquire the camera and begin streaming
    pub fn start(&mut self) -> Result<(), CameraError> {
        if self.state == ScannerState::Streaming {
            return Ok(());
        }

        self.state = ScannerState::RequestingCamera;
        match self.camera.open() {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = ScannerState::Streaming;
                tracing::debug!("Scanner streaming");
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Camera unavailable: {}", e);
                self.state = ScannerState::Error(e);
                Err(e)
            }
        }
    }

    /// Inspect one frame. Returns a code the first time it is seen; the
    /// same code seen again straight after is ignored.
    pub fn poll(&mut self) -> Option<String> {
        let stream = self.stream.as_mut()?;
        let frame = stream.next_frame()?;
        let code = self.decoder.decode(&frame)?;

        if self.last_emitted.as_deref() == Some(code.as_str()) {
            return None;
        }
        tracing::debug!("Barcode detected on frame {}: {}", frame.index, code);
        self.emit(code.clone());
        Some(code)
    }

    /// Poll until a code is found or `timeout` passes
    pub async fn scan(&mut self, timeout: Duration, frame_interval: Duration) -> Result<String, ScanError> {
        self.start()?;

        let mut ticker = tokio::time::interval(frame_interval.max(Duration::from_millis(1)));
        let result = tokio::time::timeout(timeout, async {
            loop {
                ticker.tick().await;
                if let Some(code) = self.poll() {
                    return code;
                }
            }
        })
        .await;

        match result {
            Ok(code) => Ok(code),
            Err(_) => {
                self.close();
                Err(ScanError::Timeout(timeout))
            }
        }
    }

    /// Typed fallback when the camera cannot be used
    pub fn manual_entry(&mut self, code: &str) -> Result<String, ScanError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(ScanError::EmptyCode);
        }
        self.emit(code.to_string());
        Ok(code.to_string())
    }

    /// Tear down and request the camera again
    pub fn retry(&mut self) -> Result<(), CameraError> {
        self.release();
        self.state = ScannerState::Idle;
        self.start()
    }

    /// Release the camera and forget the last code
    pub fn close(&mut self) {
        self.release();
        self.state = ScannerState::Idle;
        self.last_emitted = None;
    }

    fn emit(&mut self, code: String) {
        self.release();
        if let Some(hook) = &self.on_detect {
            hook(&code);
        }
        self.last_emitted = Some(code.clone());
        self.state = ScannerState::Detected(code);
    }

    fn release(&mut self) {
        if self.stream.take().is_some() {
            tracing::debug!("Scanner released camera");
        }
    }
}

impl Drop for BarcodeScanner {
    fn drop(&mut self) {
        self.release();
    }
}

/// Plausible ISBN-13 or ISBN-10
pub fn validate_barcode(code: &str) -> bool {
    ISBN13.is_match(code) || ISBN10.is_match(code)
}

pub fn barcode_format(code: &str) -> BarcodeFormat {
    if ISBN13.is_match(code) {
        BarcodeFormat::Isbn13
    } else if ISBN10.is_match(code) {
        BarcodeFormat::Isbn10
    } else {
        BarcodeFormat::Unknown
    }
}

/// Hyphenated display form of a 13- or 10-character code
pub fn format_barcode(code: &str) -> String {
    if !code.is_ascii() {
        return code.to_string();
    }
    match code.len() {
        13 => format!(
            "{}-{}-{}-{}-{}",
            &code[0..3],
            &code[3..4],
            &code[4..7],
            &code[7..12],
            &code[12..]
        ),
        10 => format!("{}-{}-{}-{}", &code[0..1], &code[1..4], &code[4..9], &code[9..]),
        _ => code.to_string(),
    }
}

/// Builds scanners from configuration and resolves codes against the catalog
#[derive(Clone)]
pub struct ScannerService {
    config: ScannerConfig,
    camera: Arc<dyn Camera>,
    repository: Repository,
    catalog: CatalogService,
    history: Arc<RwLock<Vec<ScanRecord>>>,
}

impl ScannerService {
    pub fn new(config: ScannerConfig, repository: Repository, catalog: CatalogService) -> Self {
        let camera: Arc<dyn Camera> = match config.camera {
            CameraKind::Synthetic => Arc::new(SyntheticCamera::new()),
            CameraKind::None => Arc::new(UnavailableCamera(CameraError::NoDevice)),
        };
        Self::with_camera(config, camera, repository, catalog)
    }

    pub fn with_camera(
        config: ScannerConfig,
        camera: Arc<dyn Camera>,
        repository: Repository,
        catalog: CatalogService,
    ) -> Self {
        Self {
            config,
            camera,
            repository,
            catalog,
            history: Arc::new(RwLock::new(Vec::new())),
        }
    }

    fn decoder(&self) -> Box<dyn BarcodeDecoder> {
        match self.config.decoder {
            DecoderKind::Simulated => Box::new(SimulatedDecoder::new(
                StdRng::from_entropy(),
                self.config.detection_probability,
                self.config.sample_codes.clone(),
            )),
            DecoderKind::Fixture => Box::new(FixtureDecoder::from_codes(&self.config.fixture_codes)),
        }
    }

    pub fn scanner(&self) -> BarcodeScanner {
        let hook: DetectionHook = Arc::new(|code: &str| {
            tracing::debug!("Detection feedback for {}", code);
        });
        BarcodeScanner::new(self.camera.clone(), self.decoder()).with_detection_hook(hook)
    }

    /// Open the camera, wait for one code and look it up
    pub async fn scan_once(&self) -> AppResult<ScanOutcome> {
        let mut scanner = self.scanner();
        let code = scanner
            .scan(
                Duration::from_secs(self.config.scan_timeout_secs),
                Duration::from_millis(self.config.frame_interval_ms),
            )
            .await?;
        self.resolve(code, ScanSource::Camera).await
    }

    /// Look up a code typed by hand
    pub async fn manual(&self, code: &str) -> AppResult<ScanOutcome> {
        let code = self.scanner().manual_entry(code)?;
        self.resolve(code, ScanSource::Manual).await
    }

    async fn resolve(&self, code: String, source: ScanSource) -> AppResult<ScanOutcome> {
        if !validate_barcode(&code) {
            tracing::warn!("Scanned code {} is not an ISBN", code);
        }
        let format = barcode_format(&code);

        self.history.write().await.push(ScanRecord {
            code: code.clone(),
            format,
            source,
            timestamp: Utc::now(),
        });

        let students = self.repository.ledger.load().await?;
        let book = self.catalog.find_by_code(&code).map(|b| view(b, &students));

        Ok(ScanOutcome {
            formatted: format_barcode(&code),
            code,
            source,
            book,
        })
    }

    /// Scans so far, newest first
    pub async fn history(&self) -> Vec<ScanRecord> {
        self.history.read().await.iter().rev().cloned().collect()
    }
}
