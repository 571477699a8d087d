//! Stimulus generation and the fingerprint codec.
//!
//! A stimulus is one survey question: two color cycles of the same length,
//! four presentation orders, and a drawing mode. Its fingerprint is the
//! canonical serialization the client must echo back verbatim, and the
//! only thing the session remembers about an outstanding question.
use rand::{Rng, seq::SliceRandom};

use crate::palette::{PaletteStore, SUPPORTED_LENGTHS};

pub const ORDER_COUNT: usize = 4;
pub const DRAW_MODES: u8 = 4;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stimulus {
    pub set1: Vec<String>,
    pub set2: Vec<String>,
    /// Four comma-joined permutations of `[0, cycle length)`.
    pub orders: Vec<String>,
    pub draw_mode: u8,
}

impl Stimulus {
    /// Samples a fresh question: a uniform cycle length, two independent
    /// cycles of that length (they may coincide), four independent random
    /// permutations, and a uniform drawing mode.
    pub fn generate<R: Rng>(palettes: &PaletteStore, rng: &mut R) -> Self {
        let length = SUPPORTED_LENGTHS[rng.gen_range(0..SUPPORTED_LENGTHS.len())];

        let set1 = palettes.sample(length, rng);
        let set2 = palettes.sample(length, rng);

        let orders = (0..ORDER_COUNT)
            .map(|_| {
                let mut order: Vec<usize> = (0..length).collect();
                order.shuffle(rng);
                order
                    .iter()
                    .map(ToString::to_string)
                    .collect::<Vec<_>>()
                    .join(",")
            })
            .collect();

        let draw_mode = rng.gen_range(0..DRAW_MODES);

        Self {
            set1,
            set2,
            orders,
            draw_mode,
        }
    }

    /// Canonical serialization: `set1;set2;orders;drawMode` with every list
    /// comma-joined. The client flattens the four order strings with commas
    /// when echoing, so the flattened form is the canonical one.
    pub fn fingerprint(&self) -> String {
        format!(
            "{};{};{};{}",
            self.set1.join(","),
            self.set2.join(","),
            self.orders.join(","),
            self.draw_mode
        )
    }

    /// Inverse of [`fingerprint`](Self::fingerprint), used to re-serve a
    /// pending question on page reload. The flattened order list is chunked
    /// back into permutations using the set length. Returns `None` on any
    /// structural mismatch.
    pub fn from_fingerprint(fingerprint: &str) -> Option<Self> {
        let mut parts = fingerprint.split(';');

        let set1: Vec<String> = parts.next()?.split(',').map(str::to_owned).collect();
        let set2: Vec<String> = parts.next()?.split(',').map(str::to_owned).collect();
        let flat: Vec<&str> = parts.next()?.split(',').collect();
        let draw_mode: u8 = parts.next()?.parse().ok()?;

        if parts.next().is_some() {
            return None;
        }

        let length = set1.len();
        if length == 0 || set2.len() != length || flat.len() % length != 0 {
            return None;
        }

        let orders = flat.chunks(length).map(|chunk| chunk.join(",")).collect();

        Some(Self {
            set1,
            set2,
            orders,
            draw_mode,
        })
    }
}
