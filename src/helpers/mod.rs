// Copyright 2020 The Repochain Team
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//   http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Common widely used typedefs.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use std::fmt;
use std::ops::Add;

/// Blockchain height (number of committed blocks).
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Height(pub u64);

impl Height {
    /// Returns zero value of the height.
    pub fn zero() -> Self {
        Height(0)
    }

    /// Returns next value of the height.
    pub fn next(self) -> Self {
        Height(self.0 + 1)
    }

    /// Returns previous value of the height.
    ///
    /// # Panics
    ///
    /// Panics if `self.0` is equal to zero.
    pub fn previous(self) -> Self {
        assert_ne!(0, self.0);
        Height(self.0 - 1)
    }

    /// Increments the height value.
    pub fn increment(&mut self) {
        self.0 += 1;
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for Height {
    fn from(value: u64) -> Self {
        Height(value)
    }
}

impl From<Height> for u64 {
    fn from(value: Height) -> Self {
        value.0
    }
}

impl Add<u64> for Height {
    type Output = Height;

    fn add(self, rhs: u64) -> Height {
        Height(self.0 + rhs)
    }
}

// Serialization/deserialization is implemented manually because TOML round-trip
// for tuple structs is broken currently.
// See https://github.com/alexcrichton/toml-rs/issues/194 for details.
impl Serialize for Height {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        self.0.serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Height {
    fn deserialize<D>(deserializer: D) -> Result<Height, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Height(u64::deserialize(deserializer)?))
    }
}

/// Performs the logger initialization.
pub fn init_logger() -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_default_env().try_init()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn height_arithmetic() {
        let height = Height(10);
        assert_eq!(Height(11), height.next());
        assert_eq!(Height(9), height.previous());
        assert_eq!(Height(13), height + 3);

        let mut height = Height::zero();
        height.increment();
        assert_eq!(Height(1), height);
    }

    #[test]
    #[should_panic]
    fn height_underflow() {
        Height::zero().previous();
    }
}
