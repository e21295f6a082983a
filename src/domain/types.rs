//! Shared domain types.
//!
//! These types are plain data records handed from one pipeline stage to the
//! next: observations in, parameter estimates and fit results out.

use std::path::PathBuf;

/// Lower and upper end of the synthesized `t` range used when the input has no
/// time column.
pub const FALLBACK_T_RANGE: (f64, f64) = (6.0, 60.0);

/// Where the independent variable came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeSource {
    /// A column literally named `t`.
    Named,
    /// The first of three (or more) columns, whatever its name.
    Positional,
    /// No time column; `t` was synthesized over `FALLBACK_T_RANGE`.
    Synthesized,
}

impl TimeSource {
    pub fn display_name(self) -> &'static str {
        match self {
            TimeSource::Named => "column `t`",
            TimeSource::Positional => "first column",
            TimeSource::Synthesized => "synthesized over [6, 60]",
        }
    }
}

/// Observed samples, one entry per input row (file order is preserved).
#[derive(Debug, Clone, PartialEq)]
pub struct Observations {
    pub t: Vec<f64>,
    pub x: Vec<f64>,
    pub y: Vec<f64>,
    pub time_source: TimeSource,
}

impl Observations {
    /// Build from three sequences.
    ///
    /// # Panics
    /// Panics if the sequences differ in length. Ingest validates row shapes
    /// before calling this, so a mismatch is a programming error.
    pub fn new(t: Vec<f64>, x: Vec<f64>, y: Vec<f64>, time_source: TimeSource) -> Self {
        assert!(
            t.len() == x.len() && x.len() == y.len(),
            "observation sequences must have equal length"
        );
        Self {
            t,
            x,
            y,
            time_source,
        }
    }

    pub fn len(&self) -> usize {
        self.t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.t.is_empty()
    }
}

/// Summary stats about the observations actually used for fitting.
#[derive(Debug, Clone, PartialEq)]
pub struct DatasetStats {
    pub n_points: usize,
    pub t_min: f64,
    pub t_max: f64,
    pub x_min: f64,
    pub x_max: f64,
    pub y_min: f64,
    pub y_max: f64,
}

/// Model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Params {
    /// Rotation angle (radians).
    pub theta: f64,
    /// Exponential growth-rate coefficient.
    pub m: f64,
    /// Horizontal offset.
    pub x_offset: f64,
}

impl Params {
    pub const DIM: usize = 3;

    pub fn new(theta: f64, m: f64, x_offset: f64) -> Self {
        Self { theta, m, x_offset }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.theta, self.m, self.x_offset]
    }

    pub fn from_array(v: [f64; 3]) -> Self {
        Self::new(v[0], v[1], v[2])
    }

    pub fn theta_deg(self) -> f64 {
        self.theta.to_degrees()
    }
}

/// Rectangular box of admissible parameter values (inclusive on both ends).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamBounds {
    pub theta: (f64, f64),
    pub m: (f64, f64),
    pub x_offset: (f64, f64),
}

impl Default for ParamBounds {
    fn default() -> Self {
        Self {
            theta: (0.0001_f64.to_radians(), 50.0_f64.to_radians()),
            m: (-0.05, 0.05),
            x_offset: (0.0, 100.0),
        }
    }
}

impl ParamBounds {
    pub fn lower(&self) -> [f64; 3] {
        [self.theta.0, self.m.0, self.x_offset.0]
    }

    pub fn upper(&self) -> [f64; 3] {
        [self.theta.1, self.m.1, self.x_offset.1]
    }

    pub fn contains(&self, p: &Params) -> bool {
        let lo = self.lower();
        let hi = self.upper();
        p.to_array()
            .iter()
            .enumerate()
            .all(|(i, &v)| v >= lo[i] && v <= hi[i])
    }

    /// Project a point onto the box component-wise.
    pub fn clamp(&self, p: Params) -> Params {
        let lo = self.lower();
        let hi = self.upper();
        let mut v = p.to_array();
        for i in 0..3 {
            v[i] = v[i].clamp(lo[i], hi[i]);
        }
        Params::from_array(v)
    }
}

/// Differential evolution settings.
#[derive(Debug, Clone, PartialEq)]
pub struct GlobalSettings {
    /// Maximum number of generations.
    pub max_iter: usize,
    /// Population size multiplier (population = `popsize * dim`).
    pub popsize: usize,
    /// Relative convergence tolerance on the population energy spread.
    pub tol: f64,
    /// Absolute convergence tolerance on the population energy spread.
    pub atol: f64,
    /// Dithered mutation range `[lo, hi)`, redrawn every generation.
    pub mutation: (f64, f64),
    /// Crossover probability.
    pub recombination: f64,
    pub seed: u64,
}

impl Default for GlobalSettings {
    fn default() -> Self {
        Self {
            max_iter: 50,
            popsize: 15,
            tol: 1e-6,
            atol: 0.0,
            mutation: (0.5, 1.0),
            recombination: 0.7,
            seed: 42,
        }
    }
}

/// Bounded Levenberg–Marquardt settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalSettings {
    pub max_iter: usize,
    /// Relative step tolerance.
    pub xtol: f64,
    /// Relative cost-change tolerance.
    pub ftol: f64,
    /// Gradient (infinity norm) tolerance.
    pub gtol: f64,
    pub initial_lambda: f64,
    pub lambda_up: f64,
    pub lambda_down: f64,
    /// Give up once damping grows past this without finding a better point.
    pub max_lambda: f64,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            max_iter: 1000,
            xtol: 1e-12,
            ftol: 1e-12,
            gtol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            max_lambda: 1e16,
        }
    }
}

/// A full run's configuration.
///
/// There are no CLI flags or environment knobs; the binary always runs with
/// `FitConfig::default()`. Tests substitute paths and settings.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub input_path: PathBuf,
    pub results_path: PathBuf,
    pub plot_path: PathBuf,
    pub bounds: ParamBounds,
    pub global: GlobalSettings,
    pub local: LocalSettings,
    pub plot_width: u32,
    pub plot_height: u32,
    /// Print a character-grid rendering of the XY panel to stdout.
    pub terminal_preview: bool,
}

impl Default for FitConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("xy_data.csv"),
            results_path: PathBuf::from("fit_results.txt"),
            plot_path: PathBuf::from("fit_plot.png"),
            bounds: ParamBounds::default(),
            global: GlobalSettings::default(),
            local: LocalSettings::default(),
            plot_width: 1000,
            plot_height: 500,
            terminal_preview: true,
        }
    }
}

/// Final fit output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitResult {
    pub params: Params,
    pub theta_deg: f64,
    /// Total L1 distance between model and data at `params`.
    pub l1: f64,
}

impl FitResult {
    pub fn new(params: Params, l1: f64) -> Self {
        Self {
            params,
            theta_deg: params.theta_deg(),
            l1,
        }
    }
}
