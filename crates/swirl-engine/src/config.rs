//! Pipeline configuration and validation.
//!
//! [`PipelineConfig`] is plain data with defaults matching the production
//! deployment: deferred synchronization (strict with the `strict-sync`
//! feature), quality 75, camera at simulation resolution, the
//! momentum-transfer rule and direction-as-hue colouring.
//! [`validate()`](PipelineConfig::validate) is called by
//! [`Pipeline::new`](crate::Pipeline::new) before anything touches the
//! device.

use std::sync::Arc;

use swirl_core::{DimsError, GridDims, PixelBuffer, Quality};
use swirl_device::SyncMode;
use swirl_raster::{ColorTransfer, DirectionHue, Magnitude};
use swirl_sim::{Diffusion, MomentumTransfer, StoreError, UpdateRule};
use thiserror::Error;

// ── RuleConfig ─────────────────────────────────────────────────────

/// Which update rule advances the field, with its parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum RuleConfig {
    /// [`MomentumTransfer`].
    MomentumTransfer {
        /// Neighbourhood radius, at least 2. Default: 9.
        radius: u32,
        /// Angular dispersion in `[-0.25, 0.25]`. Default: -0.25.
        dispersion: f32,
    },
    /// [`Diffusion`].
    Diffusion {
        /// Exchange rate in `(0, 0.25]`.
        rate: f32,
    },
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self::MomentumTransfer {
            radius: MomentumTransfer::DEFAULT_RADIUS,
            dispersion: MomentumTransfer::DEFAULT_DISPERSION,
        }
    }
}

impl RuleConfig {
    /// Instantiate the rule.
    pub fn build(&self) -> Result<Arc<dyn UpdateRule>, ConfigError> {
        let rule: Arc<dyn UpdateRule> = match *self {
            Self::MomentumTransfer { radius, dispersion } => {
                Arc::new(MomentumTransfer::new(radius, dispersion).map_err(ConfigError::rule)?)
            }
            Self::Diffusion { rate } => Arc::new(Diffusion::new(rate).map_err(ConfigError::rule)?),
        };
        Ok(rule)
    }
}

// ── TransferKind ───────────────────────────────────────────────────

/// Which colour transfer the rasterizer applies.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TransferKind {
    /// [`DirectionHue`].
    #[default]
    DirectionHue,
    /// [`Magnitude`].
    Magnitude,
}

impl TransferKind {
    /// Instantiate the policy.
    pub fn build(self) -> Box<dyn ColorTransfer> {
        match self {
            Self::DirectionHue => Box::new(DirectionHue),
            Self::Magnitude => Box::new(Magnitude),
        }
    }
}

// ── InitialField ───────────────────────────────────────────────────

/// Contents of the FieldGrid right after initialization.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum InitialField {
    /// All cells zero.
    #[default]
    Zero,
    /// Deterministic uniform noise.
    Noise {
        /// ChaCha8 seed.
        seed: u64,
        /// Per-component bound, finite and non-negative.
        amplitude: f32,
    },
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected by [`PipelineConfig::validate`].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    /// Update-rule parameters out of range.
    #[error("invalid update rule: {reason}")]
    Rule {
        /// Which parameter was rejected.
        reason: String,
    },
    /// Camera resolution is not a valid image size.
    #[error("invalid camera: {0}")]
    Camera(#[from] DimsError),
    /// Initial-field parameters out of range.
    #[error("invalid initial field: {reason}")]
    InitialField {
        /// Which parameter was rejected.
        reason: String,
    },
}

impl ConfigError {
    fn rule(e: StoreError) -> Self {
        match e {
            StoreError::InvalidParams { reason } => Self::Rule { reason },
            other => Self::Rule {
                reason: other.to_string(),
            },
        }
    }
}

// ── PipelineConfig ─────────────────────────────────────────────────

/// Everything a [`Pipeline`](crate::Pipeline) needs besides its device.
#[derive(Clone, Debug, PartialEq)]
pub struct PipelineConfig {
    /// Device fault-detection discipline. Default:
    /// [`SyncMode::build_default`].
    pub sync: SyncMode,
    /// Encoder quality. Default: 75.
    pub quality: Quality,
    /// Output resolution `(width, height)`. `None` = simulation resolution.
    pub camera: Option<(u32, u32)>,
    /// Update rule.
    pub rule: RuleConfig,
    /// Colour transfer.
    pub transfer: TransferKind,
    /// FieldGrid contents after initialization.
    pub initial: InitialField,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            sync: SyncMode::build_default(),
            quality: Quality::DEFAULT,
            camera: None,
            rule: RuleConfig::default(),
            transfer: TransferKind::default(),
            initial: InitialField::default(),
        }
    }
}

impl PipelineConfig {
    /// Check every field. Quality is valid by construction.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.rule.build()?;
        if let Some((w, h)) = self.camera {
            PixelBuffer::check_size(GridDims::new(w, h)?)?;
        }
        if let InitialField::Noise { amplitude, .. } = self.initial {
            if !amplitude.is_finite() || amplitude < 0.0 {
                return Err(ConfigError::InitialField {
                    reason: format!("noise amplitude must be finite and non-negative, got {amplitude}"),
                });
            }
        }
        Ok(())
    }

    /// Camera resolution for a grid of `grid` cells. A grid too large to
    /// encode as one frame needs an explicit, smaller camera.
    pub(crate) fn camera_dims(&self, grid: GridDims) -> Result<GridDims, ConfigError> {
        let dims = match self.camera {
            Some((w, h)) => GridDims::new(w, h)?,
            None => grid,
        };
        Ok(PixelBuffer::check_size(dims)?)
    }
}
