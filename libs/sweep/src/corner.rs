//! Enumeration of the corners of a [`SweepSpec`].
//!
//! Corners are enumerated in mixed-radix counting order: parameter axes in
//! declaration order, then library axes in declaration order, then
//! temperatures, with the last axis varying fastest. The enumeration is a pure
//! function of the specification, so a given [`CornerId`] always refers to the
//! same assignment for the same specification.

use std::cmp::Ordering;
use std::fmt::Display;
use std::hash::{Hash, Hasher};
use std::iter::FusedIterator;

use arcstr::ArcStr;
use indexmap::IndexMap;
use itertools::Itertools;
use unicase::UniCase;

use crate::error::{Error, Result};
use crate::{LibId, SweepSpec, Temperature};

/// The minimum number of digits in a corner ID.
pub const MIN_ID_WIDTH: usize = 4;

/// A stable identifier for a corner, displayed as `c0001`, `c0002`, ....
///
/// IDs are 1-based and zero-padded to at least [`MIN_ID_WIDTH`] digits.
/// Sweeps with more corners than fit in that width are padded to the width of
/// the largest ID, so that IDs of one sweep always sort lexically.
#[derive(Copy, Clone, Debug)]
pub struct CornerId {
    index: usize,
    width: usize,
}

/// One point of the sweep space.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Corner {
    id: CornerId,
    params: IndexMap<UniCase<ArcStr>, ArcStr>,
    libs: IndexMap<LibId, ArcStr>,
    temperature: Temperature,
}

/// A lazy iterator over the corners of a [`SweepSpec`].
#[derive(Clone, Debug)]
pub struct Corners<'a> {
    spec: &'a SweepSpec,
    radices: Vec<usize>,
    front: usize,
    back: usize,
    width: usize,
}

impl CornerId {
    fn new(index: usize, total: usize) -> Self {
        Self {
            index,
            width: id_width(total),
        }
    }

    /// The 0-based position of this corner in enumeration order.
    #[inline]
    pub fn index(&self) -> usize {
        self.index
    }

    /// The 1-based number of this corner.
    #[inline]
    pub fn number(&self) -> usize {
        self.index + 1
    }
}

fn id_width(total: usize) -> usize {
    let mut digits = 1;
    let mut rest = total / 10;
    while rest > 0 {
        digits += 1;
        rest /= 10;
    }
    digits.max(MIN_ID_WIDTH)
}

impl Display for CornerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "c{:0width$}", self.number(), width = self.width)
    }
}

impl PartialEq for CornerId {
    fn eq(&self, other: &Self) -> bool {
        self.index == other.index
    }
}

impl Eq for CornerId {}

impl Hash for CornerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.index.hash(state);
    }
}

impl PartialOrd for CornerId {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CornerId {
    fn cmp(&self, other: &Self) -> Ordering {
        self.index.cmp(&other.index)
    }
}

impl Corner {
    /// The ID of this corner.
    #[inline]
    pub fn id(&self) -> CornerId {
        self.id
    }

    /// The value of each swept parameter, keyed by name, in axis order.
    #[inline]
    pub fn params(&self) -> &IndexMap<UniCase<ArcStr>, ArcStr> {
        &self.params
    }

    /// The value of the swept parameter with the given case-insensitive name.
    pub fn param(&self, name: &str) -> Option<&ArcStr> {
        self.params.get(&UniCase::new(ArcStr::from(name)))
    }

    /// The value of the `idx`-th parameter axis.
    #[inline]
    pub fn param_at(&self, idx: usize) -> Option<&ArcStr> {
        self.params.get_index(idx).map(|(_, value)| value)
    }

    /// The chosen corner of each library axis, in axis order.
    #[inline]
    pub fn libs(&self) -> &IndexMap<LibId, ArcStr> {
        &self.libs
    }

    /// The chosen corner of the given library axis.
    pub fn lib(&self, id: &LibId) -> Option<&ArcStr> {
        self.libs.get(id)
    }

    /// The chosen corner of the `idx`-th library axis.
    #[inline]
    pub fn lib_at(&self, idx: usize) -> Option<&ArcStr> {
        self.libs.get_index(idx).map(|(_, value)| value)
    }

    /// The temperature of this corner.
    ///
    /// Sweeps without a temperature axis simulate every corner at the
    /// default temperature of the sweep.
    #[inline]
    pub fn temperature(&self) -> Temperature {
        self.temperature
    }
}

impl Display for Corner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let assignments = self
            .params
            .iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .chain(self.libs.iter().map(|(id, value)| format!("{}={}", id, value)))
            .chain(std::iter::once(format!("temp={}", self.temperature)))
            .join(", ");
        write!(f, "{} ({})", self.id, assignments)
    }
}

impl SweepSpec {
    /// The number of values of each axis, in enumeration order.
    fn radices(&self) -> Vec<usize> {
        let mut radices: Vec<usize> = self
            .params()
            .map(|p| p.values().len())
            .chain(self.libs().map(|l| l.corners().len()))
            .collect();
        if !self.temperatures().is_empty() {
            radices.push(self.temperatures().len());
        }
        radices
    }

    /// The total number of corners, or `None` if it overflows a `usize`.
    ///
    /// A specification with no axes has exactly one corner.
    pub fn num_corners(&self) -> Option<usize> {
        self.radices()
            .into_iter()
            .try_fold(1usize, |acc, radix| acc.checked_mul(radix))
    }

    /// Returns a lazy iterator over all corners in enumeration order.
    pub fn corners(&self) -> Result<Corners<'_>> {
        let total = self.num_corners().ok_or(Error::CornerSpaceOverflow)?;
        Ok(Corners {
            spec: self,
            radices: self.radices(),
            front: 0,
            back: total,
            width: id_width(total),
        })
    }

    /// Returns the corner at the given 0-based enumeration index.
    pub fn corner(&self, index: usize) -> Option<Corner> {
        let total = self.num_corners()?;
        if index >= total {
            return None;
        }
        Some(self.decode(&self.radices(), index, CornerId::new(index, total)))
    }

    fn decode(&self, radices: &[usize], index: usize, id: CornerId) -> Corner {
        let mut digits = vec![0; radices.len()];
        let mut rest = index;
        for (digit, radix) in digits.iter_mut().zip(radices).rev() {
            *digit = rest % radix;
            rest /= radix;
        }

        let mut digits = digits.into_iter();
        let params = self
            .params
            .iter()
            .zip(digits.by_ref())
            .map(|((key, axis), digit)| (key.clone(), axis.values[digit].clone()))
            .collect();
        let libs = self
            .libs
            .iter()
            .zip(digits.by_ref())
            .map(|((id, axis), digit)| (id.clone(), axis.corners[digit].clone()))
            .collect();
        let temperature = digits
            .next()
            .map_or(self.default_temperature, |digit| self.temperatures[digit]);

        Corner {
            id,
            params,
            libs,
            temperature,
        }
    }
}

impl Corners<'_> {
    fn corner_at(&self, index: usize) -> Corner {
        self.spec.decode(
            &self.radices,
            index,
            CornerId {
                index,
                width: self.width,
            },
        )
    }
}

impl Iterator for Corners<'_> {
    type Item = Corner;

    fn next(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        let corner = self.corner_at(self.front);
        self.front += 1;
        Some(corner)
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let len = self.back - self.front;
        (len, Some(len))
    }

    fn nth(&mut self, n: usize) -> Option<Self::Item> {
        self.front = self.front.saturating_add(n).min(self.back);
        self.next()
    }
}

impl DoubleEndedIterator for Corners<'_> {
    fn next_back(&mut self) -> Option<Self::Item> {
        if self.front >= self.back {
            return None;
        }
        self.back -= 1;
        Some(self.corner_at(self.back))
    }
}

impl ExactSizeIterator for Corners<'_> {}

impl FusedIterator for Corners<'_> {}
