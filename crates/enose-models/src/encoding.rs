//! Spike encoding: sensor features to per-timestep channel events to masks.
//!
//! Floating point is confined to this module; everything downstream of a
//! mask is integer.

use crate::error::{ModelError, Result};
use enose_chip::stream;

/// Positive/negative delta encoder.
///
/// Each of the `F` features keeps an accumulator seeded with its first
/// sample. A timestep emits on channel `k` when the feature has risen by at
/// least `thresholds[k]` above the accumulator, or on channel `F + k` when it
/// has fallen by as much; the accumulator then steps one threshold toward
/// the sample. At most one spike per feature per timestep.
#[derive(Debug, Clone, PartialEq)]
pub struct DeltaEncoder {
    thresholds: Vec<f32>,
}

impl DeltaEncoder {
    /// Encoder with one threshold per feature
    ///
    /// # Errors
    ///
    /// `Parse` if a threshold is not strictly positive and finite.
    pub fn new(thresholds: Vec<f32>) -> Result<Self> {
        if let Some((k, t)) = thresholds
            .iter()
            .enumerate()
            .find(|(_, t)| !(t.is_finite() && **t > 0.0))
        {
            return Err(ModelError::parse_error(format!(
                "threshold {k} must be positive, got {t}"
            )));
        }
        Ok(Self { thresholds })
    }

    /// Feature count `F`
    pub fn features(&self) -> usize {
        self.thresholds.len()
    }

    /// Output channels (`2F`)
    pub fn channels(&self) -> usize {
        2 * self.thresholds.len()
    }

    /// Encode a `[T][F]` window into per-timestep channel lists.
    ///
    /// # Errors
    ///
    /// `Shape` if a row does not have `F` features.
    pub fn encode<R: AsRef<[f32]>>(&self, window: &[R]) -> Result<Vec<Vec<usize>>> {
        let f = self.features();
        if let Some((t, row)) = window.iter().enumerate().find(|(_, r)| r.as_ref().len() != f) {
            return Err(ModelError::shape(format!(
                "timestep {t} has {} features, encoder expects {f}",
                row.as_ref().len()
            )));
        }
        let Some(first) = window.first() else {
            return Ok(Vec::new());
        };

        let mut acc = first.as_ref().to_vec();
        let events = window
            .iter()
            .map(|row| {
                let mut ev = Vec::new();
                for (k, (&x, &thr)) in row.as_ref().iter().zip(&self.thresholds).enumerate() {
                    let d = x - acc[k];
                    if d >= thr {
                        ev.push(k);
                        acc[k] += thr;
                    } else if d <= -thr {
                        ev.push(f + k);
                        acc[k] -= thr;
                    }
                }
                ev
            })
            .collect();
        Ok(events)
    }

    /// Encode straight to masks
    ///
    /// # Errors
    ///
    /// As [`Self::encode`] and [`events_to_masks`].
    pub fn encode_masks<R: AsRef<[f32]>>(&self, window: &[R]) -> Result<Vec<u32>> {
        events_to_masks(&self.encode(window)?, self.channels())
    }
}

/// Pack per-timestep channel lists into masks.
///
/// # Errors
///
/// `Shape` if a channel is outside `0..n_in` or `n_in` exceeds the word.
pub fn events_to_masks<E: AsRef<[usize]>>(events: &[E], n_in: usize) -> Result<Vec<u32>> {
    if n_in > stream::MAX_CHANNELS {
        return Err(ModelError::shape(format!(
            "{n_in} channels do not fit a {}-bit word",
            stream::WORD_BITS
        )));
    }
    events
        .iter()
        .enumerate()
        .map(|(t, ev)| {
            ev.as_ref().iter().try_fold(0u32, |mask, &ch| {
                if ch < n_in {
                    Ok(mask | (1 << ch))
                } else {
                    Err(ModelError::shape(format!(
                        "timestep {t}: channel {ch} outside 0..{n_in}"
                    )))
                }
            })
        })
        .collect()
}

/// Pack per-timestep spike vectors (`[T][n_in]` booleans) into masks.
pub fn spikes_to_masks<S: AsRef<[bool]>>(spikes: &[S]) -> Vec<u32> {
    spikes.iter().map(|s| stream::pack(s.as_ref())).collect()
}

/// Channels set in a mask, ascending
pub fn mask_to_events(mask: u32, n_in: usize) -> Vec<usize> {
    (0..n_in.min(stream::MAX_CHANNELS))
        .filter(|&ch| stream::is_active(mask, ch))
        .collect()
}
