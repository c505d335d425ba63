use thiserror::Error;

// ---------------------------------------------------------------------------
// Domain errors
// ---------------------------------------------------------------------------

/// Structural problems that abort a normalization run as a whole.
#[derive(Debug, Error)]
pub enum NormalizeError {
    #[error(
        "spectrum '{label}' has {columns} complete column(s); \
         wavelength, flux and flux_error are required"
    )]
    MalformedSpectrum { label: String, columns: usize },

    #[error("spectrum '{0}' is not loaded")]
    UnknownSpectrum(String),
}

/// Per-spectrum continuum fitting failures. These never stop the run.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    #[error("unsupported continuum function '{0}' (expected plaw or poly)")]
    UnsupportedFunction(String),

    #[error("{needed} samples are needed for the fit, found {found} inside the fit windows")]
    TooFewSamples { needed: usize, found: usize },

    #[error("least-squares system is singular")]
    Singular,
}

/// Rejected interactive entries. The command is aborted, state is untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InputError {
    #[error("expected two comma-separated numbers, got '{0}'")]
    NotAPair(String),

    #[error("'{0}' is not a number")]
    NotANumber(String),

    #[error("lower limit {lo} must be below upper limit {hi}")]
    Inverted { lo: f64, hi: f64 },
}
