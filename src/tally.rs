use std::fmt;
use std::ops::RangeInclusive;

pub const PRINTABLE: RangeInclusive<u8> = 32..=126;

pub const PRINTABLE_COUNT: usize = 95;

pub fn is_printable(byte: u8) -> bool {
    PRINTABLE.contains(&byte)
}

/// Occurrences of each printable byte, per connection or server lifetime.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Tally {
    counts: [u64; PRINTABLE_COUNT],
}

impl Default for Tally {
    fn default() -> Self {
        Tally {
            counts: [0; PRINTABLE_COUNT],
        }
    }
}

impl Tally {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(byte: u8) -> Option<usize> {
        if is_printable(byte) {
            Some((byte - *PRINTABLE.start()) as usize)
        } else {
            None
        }
    }

    /// Count the printable bytes of `batch`, returning how many there were.
    pub fn observe(&mut self, batch: &[u8]) -> u32 {
        let mut printable = 0;
        for &byte in batch {
            if let Some(slot) = Self::slot(byte) {
                self.counts[slot] += 1;
                printable += 1;
            }
        }
        printable
    }

    pub fn get(&self, byte: u8) -> Option<u64> {
        Self::slot(byte).map(|slot| self.counts[slot])
    }

    pub fn total(&self) -> u64 {
        self.counts.iter().sum()
    }

    pub fn merge(&mut self, other: &Tally) {
        for (total, count) in self.counts.iter_mut().zip(other.counts.iter()) {
            *total += count;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (char, u64)> + '_ {
        PRINTABLE
            .zip(self.counts.iter())
            .map(|(byte, &count)| (byte as char, count))
    }
}

impl fmt::Display for Tally {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (c, count) in self.iter() {
            writeln!(f, "char '{}' : {} times", c, count)?;
        }
        Ok(())
    }
}
