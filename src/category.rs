//! Named logging categories and the shared enable/disable bitmask.
//!
//! Categories are plain table rows (name, bit, description) so the operator
//! surface can iterate, match and print them without generated code. The
//! mask itself is one `AtomicU32`: every enable/disable is a single
//! read-modify-write, so a concurrent gate check never sees half an update.

use std::fmt;
use std::sync::atomic::{AtomicU32, Ordering};

use tracing::info;

use crate::error::CategoryError;

/// Keyword that addresses every known category at once.
pub const ALL_KEYWORD: &str = "all";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Category {
    pub name: &'static str,
    pub bit: u8,
    pub description: &'static str,
}

impl Category {
    pub const fn new(name: &'static str, bit: u8, description: &'static str) -> Self {
        Self {
            name,
            bit,
            description,
        }
    }

    pub const fn mask(&self) -> u32 {
        1u32 << self.bit
    }
}

pub const ATTITUDE_FAST: Category = Category::new("ATTITUDE_FAST", 0, "attitude at loop rate");
pub const ATTITUDE_MED: Category = Category::new("ATTITUDE_MED", 1, "attitude at 10Hz");
pub const GPS: Category = Category::new("GPS", 2, "GPS fixes");
pub const PM: Category = Category::new("PM", 3, "performance monitoring");
pub const CTUN: Category = Category::new("CTUN", 4, "control tuning");
pub const NTUN: Category = Category::new("NTUN", 5, "navigation tuning");
pub const MODE: Category = Category::new("MODE", 6, "flight mode changes");
pub const IMU: Category = Category::new("IMU", 7, "inertial sensors and optical flow");
pub const CMD: Category = Category::new("CMD", 8, "mission commands");
pub const CURRENT: Category = Category::new("CURRENT", 9, "battery current");
pub const COMPASS: Category = Category::new("COMPASS", 10, "compass");
pub const TECS: Category = Category::new("TECS", 11, "speed/height controller");
pub const CAMERA: Category = Category::new("CAMERA", 12, "camera triggers");
pub const RC: Category = Category::new("RC", 13, "radio input and servo output");
pub const SONAR: Category = Category::new("SONAR", 14, "rangefinder");
pub const ARM_DISARM: Category = Category::new("ARM_DISARM", 15, "arming state");
pub const STRAIN_DATA: Category = Category::new("STRAIN_DATA", 16, "wing strain gauges");

/// Static name ↔ bit table.
#[derive(Debug)]
pub struct CategoryTable {
    entries: &'static [Category],
}

pub static PLANE_CATEGORIES: CategoryTable = CategoryTable::new(&[
    ATTITUDE_FAST,
    ATTITUDE_MED,
    GPS,
    PM,
    CTUN,
    NTUN,
    MODE,
    IMU,
    CMD,
    CURRENT,
    COMPASS,
    TECS,
    CAMERA,
    RC,
    SONAR,
    ARM_DISARM,
    STRAIN_DATA,
]);

impl CategoryTable {
    pub const fn new(entries: &'static [Category]) -> Self {
        Self { entries }
    }

    pub fn iter(&self) -> impl Iterator<Item = &'static Category> + '_ {
        self.entries.iter()
    }

    /// Case-insensitive lookup.
    pub fn find(&self, name: &str) -> Option<&'static Category> {
        self.entries
            .iter()
            .find(|c| c.name.eq_ignore_ascii_case(name))
    }

    /// Union of every bit the table names.
    pub fn known_bits(&self) -> u32 {
        self.entries.iter().fold(0, |acc, c| acc | c.mask())
    }

    /// Bits addressed by `name`: one category, or all of them for `"all"`.
    pub fn resolve(&self, name: &str) -> Result<u32, CategoryError> {
        let name = name.trim();
        if name.eq_ignore_ascii_case(ALL_KEYWORD) {
            return Ok(self.known_bits());
        }
        self.find(name)
            .map(Category::mask)
            .ok_or_else(|| CategoryError::UnknownCategory(name.to_string()))
    }

    pub fn names_in(&self, bits: u32) -> Vec<&'static str> {
        self.entries
            .iter()
            .filter(|c| bits & c.mask() != 0)
            .map(|c| c.name)
            .collect()
    }
}

/// The logging subsystem's category mask.
///
/// Shared between the control loop (gate checks) and the operator path
/// (enable/disable). Callers never touch the raw word except to load or
/// persist it.
#[derive(Debug)]
pub struct CategoryMask {
    bits: AtomicU32,
    table: &'static CategoryTable,
}

impl CategoryMask {
    pub fn new(table: &'static CategoryTable, bits: u32) -> Self {
        Self {
            bits: AtomicU32::new(bits),
            table,
        }
    }

    /// A mask over the plane category table.
    pub fn plane(bits: u32) -> Self {
        Self::new(&PLANE_CATEGORIES, bits)
    }

    pub fn table(&self) -> &'static CategoryTable {
        self.table
    }

    pub fn bits(&self) -> u32 {
        self.bits.load(Ordering::Acquire)
    }

    /// Replaces the whole mask, e.g. after loading it from storage.
    pub fn store(&self, bits: u32) {
        self.bits.store(bits, Ordering::Release);
    }

    /// Sets the bits named by `name` and returns the new mask.
    pub fn enable(&self, name: &str) -> Result<u32, CategoryError> {
        let bits = self.table.resolve(name)?;
        let new = self.bits.fetch_or(bits, Ordering::AcqRel) | bits;
        info!(category = name, mask = new, "log category enabled");
        Ok(new)
    }

    /// Clears the bits named by `name` and returns the new mask.
    pub fn disable(&self, name: &str) -> Result<u32, CategoryError> {
        let bits = self.table.resolve(name)?;
        let new = self.bits.fetch_and(!bits, Ordering::AcqRel) & !bits;
        info!(category = name, mask = new, "log category disabled");
        Ok(new)
    }

    pub fn is_enabled(&self, category: &Category) -> bool {
        self.bits() & category.mask() != 0
    }

    pub fn enabled_names(&self) -> Vec<&'static str> {
        self.table.names_in(self.bits())
    }
}

impl fmt::Display for CategoryMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names = self.enabled_names();
        if names.is_empty() {
            f.write_str("none")
        } else {
            f.write_str(&names.join(" "))
        }
    }
}
