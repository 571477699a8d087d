//! Immutable tables of precomputed color cycles, one table per supported
//! cycle length. Loaded once at startup and shared read-only afterwards.
//!
//! Each table is a space-delimited text file where every row is one cycle
//! of hex colors and `#`-prefixed lines are comments. The tables come from
//! an offline distance-maximizing sampler, so a row's position carries no
//! meaning; `sample` picks uniformly.
use std::{collections::HashMap, path::Path};

use rand::Rng;
use tracing::info;

pub const SUPPORTED_LENGTHS: [usize; 3] = [6, 8, 10];

const TABLE_FILES: [(usize, &str); 3] = [
    (6, "colors_mcd20_mld2_nc6_cvd100_minj40_maxj90_ns10000_hsv_sorted.txt"),
    (8, "colors_mcd18_mld2_nc8_cvd100_minj40_maxj90_ns10000_hsv_sorted.txt"),
    (10, "colors_mcd16_mld2_nc10_cvd100_minj40_maxj90_ns10000_hsv_sorted.txt"),
];

pub struct PaletteStore {
    tables: HashMap<usize, Vec<Vec<String>>>,
}

impl PaletteStore {
    /// Loads every required table from `dir`. No valid survey can run
    /// without stimuli, so a missing, empty, or malformed table panics.
    pub fn load(dir: &str) -> Self {
        let mut tables = HashMap::new();

        for (length, file) in TABLE_FILES {
            let path = Path::new(dir).join(file);
            let cycles = read_cycles(&path, length);

            assert!(
                !cycles.is_empty(),
                "No color cycles of length {length} in {}",
                path.display()
            );
            info!("{} color cycles of length {} read", cycles.len(), length);

            tables.insert(length, cycles);
        }

        Self { tables }
    }

    /// Builds a store from in-memory tables. Widths are checked the same
    /// way `load` checks file rows.
    pub fn from_tables(tables: HashMap<usize, Vec<Vec<String>>>) -> Self {
        for (length, cycles) in &tables {
            assert!(!cycles.is_empty(), "Empty color table for length {length}");
            for cycle in cycles {
                assert_eq!(cycle.len(), *length, "Color cycle width mismatch");
            }
        }

        Self { tables }
    }

    /// Returns a copy of a uniformly chosen cycle of the given length.
    pub fn sample<R: Rng>(&self, length: usize, rng: &mut R) -> Vec<String> {
        let table = self
            .tables
            .get(&length)
            .expect("Unsupported cycle length sampled");

        table[rng.gen_range(0..table.len())].clone()
    }
}

fn read_cycles(path: &Path, length: usize) -> Vec<Vec<String>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b' ')
        .comment(Some(b'#'))
        .trim(csv::Trim::All)
        .has_headers(false)
        .from_path(path)
        .unwrap_or_else(|e| panic!("Cannot open color set file {}: {e}", path.display()));

    let mut cycles = Vec::new();

    for record in reader.records() {
        let record =
            record.unwrap_or_else(|e| panic!("Bad color set row in {}: {e}", path.display()));
        let cycle: Vec<String> = record.iter().map(str::to_owned).collect();

        assert_eq!(
            cycle.len(),
            length,
            "Color cycle width mismatch in {}",
            path.display()
        );

        cycles.push(cycle);
    }

    cycles
}
