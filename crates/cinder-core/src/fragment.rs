//! Time fragments and the `#t=` hash syntax.
//!
//! A [`Fragment`] restricts playback to a `[start, end]` range. `end` may
//! be infinite (open range, produced by the single-value hash form
//! `#t=<start>`). A degenerate fragment with `start == end` acts as an
//! instantaneous clamp point and never loops.
//!
//! Fragments are replaced wholesale on every update and never mutated in
//! place, so value comparison is always meaningful.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Rejected fragment bounds.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum InvalidFragment {
    /// Start was negative or not a number.
    #[error("fragment start must be a non-negative number")]
    BadStart,
    /// End was NaN or less than start.
    #[error("fragment end must not precede start")]
    BadEnd,
    /// The serialized form did not hold one or two numbers.
    #[error("fragment must be [start] or [start, end]")]
    BadShape,
}

/// An ordered playback time range in seconds.
///
/// Serialized as `[start]` (open range) or `[start, end]`, which keeps the
/// wire form JSON-safe even for open ranges (`f64::INFINITY` has no JSON
/// representation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct Fragment {
    start: f64,
    end: f64,
}

impl Fragment {
    /// Build a fragment, validating `0 <= start <= end`.
    ///
    /// `end` may be `f64::INFINITY` for an open range; `start == end` is
    /// allowed and denotes a clamp point.
    pub fn new(start: f64, end: f64) -> Result<Self, InvalidFragment> {
        if !start.is_finite() || start < 0.0 {
            return Err(InvalidFragment::BadStart);
        }
        if end.is_nan() || end < start {
            return Err(InvalidFragment::BadEnd);
        }
        Ok(Self { start, end })
    }

    /// Open range from `start` to the end of the media.
    pub fn from_start(start: f64) -> Result<Self, InvalidFragment> {
        Self::new(start, f64::INFINITY)
    }

    pub fn start(&self) -> f64 {
        self.start
    }

    pub fn end(&self) -> f64 {
        self.end
    }

    /// Whether the range is open-ended (`#t=<start>` form).
    pub fn is_open(&self) -> bool {
        self.end.is_infinite()
    }

    /// Whether the range is a degenerate clamp point.
    pub fn is_point(&self) -> bool {
        self.start == self.end
    }

    /// Inclusive containment test.
    pub fn contains(&self, time: f64) -> bool {
        time >= self.start && time <= self.end
    }

    /// Bounds clamped into a known media duration.
    ///
    /// Applied at decision time, not at store-write time: the duration may
    /// not be known yet when the fragment is set.
    pub fn clamped_to(&self, duration: Option<f64>) -> (f64, f64) {
        match duration {
            Some(d) if d.is_finite() && d > 0.0 => (self.start.min(d), self.end.min(d)),
            _ => (self.start, self.end),
        }
    }

    /// Encode as a `#t=` hash, the inverse of [`parse_hash`].
    pub fn to_hash(&self) -> String {
        if self.is_open() {
            format!("#t={}", self.start)
        } else {
            format!("#t={},{}", self.start, self.end)
        }
    }
}

impl From<Fragment> for Vec<f64> {
    fn from(frag: Fragment) -> Self {
        if frag.is_open() {
            vec![frag.start]
        } else {
            vec![frag.start, frag.end]
        }
    }
}

impl TryFrom<Vec<f64>> for Fragment {
    type Error = InvalidFragment;

    fn try_from(values: Vec<f64>) -> Result<Self, Self::Error> {
        match values.as_slice() {
            [start] => Fragment::from_start(*start),
            [start, end] => Fragment::new(*start, *end),
            _ => Err(InvalidFragment::BadShape),
        }
    }
}

/// Properties carried by a media deep-link hash.
///
/// `#t=10,20&loop&autoplay&muted` → fragment `[10, 20]`, looping on,
/// autoplay and muted requested. Flags absent from the hash stay `None`
/// so restoring a hash never clobbers unrelated state.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HashProps {
    pub fragment: Option<Fragment>,
    #[serde(default)]
    pub looping: bool,
    #[serde(default)]
    pub autoplay: Option<bool>,
    #[serde(default)]
    pub muted: Option<bool>,
}

/// Parse a deep-link hash into [`HashProps`].
///
/// Absent or empty hash yields the default (no fragment, no flags). A
/// malformed `t=` value is dropped with a warning rather than failing the
/// whole hash: deep links come from user-authored notes.
pub fn parse_hash(hash: &str) -> HashProps {
    let mut props = HashProps::default();
    let hash = hash.strip_prefix('#').unwrap_or(hash);
    for entry in hash.split('&') {
        let (key, value) = match entry.split_once('=') {
            Some((k, v)) => (k, Some(v)),
            None => (entry, None),
        };
        match key {
            "t" => match value.map(parse_time_range) {
                Some(Ok(frag)) => props.fragment = Some(frag),
                Some(Err(err)) => {
                    tracing::warn!(entry, %err, "dropping malformed time fragment in hash");
                }
                None => {}
            },
            "loop" => props.looping = true,
            "autoplay" => props.autoplay = Some(true),
            "muted" => props.muted = Some(true),
            _ => {}
        }
    }
    props
}

fn parse_time_range(value: &str) -> Result<Fragment, InvalidFragment> {
    let mut parts = value.splitn(2, ',');
    let start: f64 = parts
        .next()
        .and_then(|s| s.parse().ok())
        .ok_or(InvalidFragment::BadStart)?;
    match parts.next() {
        Some(end) => {
            let end: f64 = end.parse().map_err(|_| InvalidFragment::BadEnd)?;
            Fragment::new(start, end)
        }
        None => Fragment::from_start(start),
    }
}
