//! Limits and cancellation for one verification run.

use crate::verify::logger::Logger;

/// Default maximum nesting of embedded provenance files.
pub const DEFAULT_MAX_DEPTH: usize = 32;

/// Lets a caller stop a verification run. Checked before each proof and
/// before descending into an embedded file.
pub trait CancelSignal {
    /// Returns true once the run should stop.
    fn is_cancelled(&self) -> bool;
}

impl<F> CancelSignal for F
where
    F: Fn() -> bool,
{
    fn is_cancelled(&self) -> bool {
        self()
    }
}

/// A signal that never fires.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverCancel;

impl CancelSignal for NeverCancel {
    fn is_cancelled(&self) -> bool {
        false
    }
}

/// Everything a verification run needs besides the proof and the injected
/// verifiers.
pub struct VerifyContext<'a> {
    pub cancel: &'a dyn CancelSignal,
    /// Deepest allowed nesting of additional input files. The top-level
    /// proof is depth zero.
    pub max_depth: usize,
    pub logger: Logger,
    /// Challenge an ownership witness must sign. `None` means all zeros.
    pub challenge: Option<[u8; 32]>,
}

impl<'a> VerifyContext<'a> {
    pub fn new(cancel: &'a dyn CancelSignal) -> Self {
        VerifyContext {
            cancel,
            max_depth: DEFAULT_MAX_DEPTH,
            logger: Logger::disabled(),
            challenge: None,
        }
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_logger(mut self, logger: Logger) -> Self {
        self.logger = logger;
        self
    }

    pub fn with_challenge(mut self, challenge: [u8; 32]) -> Self {
        self.challenge = Some(challenge);
        self
    }
}

impl Default for VerifyContext<'_> {
    fn default() -> Self {
        VerifyContext::new(&NeverCancel)
    }
}

impl core::fmt::Debug for VerifyContext<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("VerifyContext")
            .field("cancelled", &self.cancel.is_cancelled())
            .field("max_depth", &self.max_depth)
            .field("logger", &self.logger)
            .field("challenge", &self.challenge)
            .finish()
    }
}
