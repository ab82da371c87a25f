//! Name anonymization
//!
//! A [`NamePool`] hands out replacement identities in file order, each at most
//! once. The loader draws from it sequentially so assignment depends only on
//! conversation order.

use crate::error::PulseError;
use std::fs;
use std::path::Path;

/// Ordered pool of replacement names, consumed without replacement
#[derive(Debug, Clone, Default)]
pub struct NamePool {
    names: Vec<String>,
    next: usize,
}

impl NamePool {
    /// Build a pool from names in order. Blank entries are dropped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let names = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { names, next: 0 }
    }

    /// Load a pool from a text file with one name per line
    pub fn from_file(path: &Path) -> Result<Self, PulseError> {
        let contents = fs::read_to_string(path)?;
        let pool = Self::from_names(contents.lines());
        if pool.names.is_empty() {
            return Err(PulseError::EmptyNamePool(path.to_path_buf()));
        }
        Ok(pool)
    }

    /// Take the next unused name
    pub fn draw(&mut self) -> Result<String, PulseError> {
        self.reserve(1)?;
        let name = self.names[self.next].clone();
        self.next += 1;
        Ok(name)
    }

    /// Check that `count` more names can be drawn
    pub fn reserve(&self, count: usize) -> Result<(), PulseError> {
        if count > self.remaining() {
            return Err(PulseError::NamePoolExhausted {
                available: self.names.len(),
                needed: self.next + count,
            });
        }
        Ok(())
    }

    /// Names not yet drawn
    pub fn remaining(&self) -> usize {
        self.names.len() - self.next
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
