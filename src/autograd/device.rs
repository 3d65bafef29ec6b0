//! Logical compute device identity

use std::fmt;

use serde::{Deserialize, Serialize};

/// The compute device a tensor resides on.
///
/// This is identity only: no implicit cross-device transfer is ever
/// performed. The quantization layer enforces a single device invariant,
/// data/scale equality at construction time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum Device {
    /// Host CPU
    #[default]
    Cpu,
    /// CUDA device with the given ordinal
    Cuda(usize),
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Device::Cpu => write!(f, "cpu"),
            Device::Cuda(ordinal) => write!(f, "cuda:{ordinal}"),
        }
    }
}
