use crate::Real;
use numeric_literals::replace_float_literals;
use serde::{Deserialize, Serialize};

/// Configuration for stopping an outer loop once a minimized loss stops improving.
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingSettings<T> {
    /// An improvement must exceed this amount to reset the patience counter.
    pub min_delta: T,
    /// Number of consecutive non-improving observations tolerated.
    pub patience: usize,
}

impl<T: Real> Default for EarlyStoppingSettings<T> {
    #[replace_float_literals(T::from_f64(literal).unwrap())]
    fn default() -> Self {
        Self {
            min_delta: 1e-8,
            patience: 10,
        }
    }
}

/// Tracks the best loss seen so far and counts observations without improvement.
#[derive(Debug, Clone)]
pub struct EarlyStopping<T> {
    settings: EarlyStoppingSettings<T>,
    best: Option<T>,
    wait: usize,
}

impl<T: Real> EarlyStopping<T> {
    pub fn new(settings: EarlyStoppingSettings<T>) -> Self {
        Self {
            settings,
            best: None,
            wait: 0,
        }
    }

    pub fn best(&self) -> Option<T> {
        self.best
    }

    /// Number of consecutive observations without sufficient improvement.
    pub fn wait(&self) -> usize {
        self.wait
    }

    /// Records a new loss and returns `true` if the loop should stop.
    ///
    /// Non-finite losses never count as an improvement.
    pub fn observe(&mut self, loss: T) -> bool {
        let improved = match self.best {
            _ if !loss.is_finite() => false,
            None => true,
            Some(best) => loss < best - self.settings.min_delta,
        };

        if improved {
            self.best = Some(loss);
            self.wait = 0;
        } else {
            self.wait += 1;
        }
        self.wait >= self.settings.patience
    }
}
