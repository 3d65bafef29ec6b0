//! Quantized type descriptors

use std::fmt;

use serde::{Deserialize, Serialize};

/// Storage element type backing quantized data.
///
/// Sub-byte formats (qint2, qint4) are stored widened to `i8`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DType {
    /// Signed 8-bit integer
    I8,
    /// Unsigned 8-bit integer
    U8,
    /// IEEE half-precision float
    F16,
}

impl DType {
    /// Storage size of one element, in bytes.
    pub fn size_bytes(&self) -> usize {
        match self {
            DType::I8 | DType::U8 => 1,
            DType::F16 => 2,
        }
    }
}

impl fmt::Display for DType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DType::I8 => write!(f, "i8"),
            DType::U8 => write!(f, "u8"),
            DType::F16 => write!(f, "f16"),
        }
    }
}

/// Representable range of a quantized type.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DTypeInfo {
    pub min: f32,
    pub max: f32,
}

/// Immutable descriptor of a target low-precision format.
///
/// Defined once per supported format as the `QINT8`-style constants below;
/// two descriptors are the same format iff they compare equal.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct QType {
    name: &'static str,
    dtype: DType,
    bits: u8,
    is_floating_point: bool,
    min: f32,
    max: f32,
}

/// 2-bit symmetric signed integer, stored as `i8`.
pub const QINT2: QType = QType::int("qint2", 2);
/// 4-bit symmetric signed integer, stored as `i8`.
pub const QINT4: QType = QType::int("qint4", 4);
/// 8-bit symmetric signed integer, stored as `i8`.
pub const QINT8: QType = QType::int("qint8", 8);
/// Unsigned 8-bit integer, stored as `u8`.
pub const QUINT8: QType = QType {
    name: "quint8",
    dtype: DType::U8,
    bits: 8,
    is_floating_point: false,
    min: 0.0,
    max: 255.0,
};
/// Half-precision float, stored as `half::f16`.
pub const QFLOAT16: QType = QType {
    name: "qfloat16",
    dtype: DType::F16,
    bits: 16,
    is_floating_point: true,
    min: -65504.0,
    max: 65504.0,
};

const ALL_QTYPES: [QType; 5] = [QINT2, QINT4, QINT8, QUINT8, QFLOAT16];

impl QType {
    /// Symmetric signed integer format: range `[-(2^(bits-1)-1), 2^(bits-1)-1]`.
    const fn int(name: &'static str, bits: u8) -> Self {
        let qmax = (1i32 << (bits - 1)) - 1;
        Self {
            name,
            dtype: DType::I8,
            bits,
            is_floating_point: false,
            min: -qmax as f32,
            max: qmax as f32,
        }
    }

    /// Canonical name of the format (e.g. `"qint8"`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Storage element type.
    pub fn dtype(&self) -> DType {
        self.dtype
    }

    /// Bit width of the logical format.
    pub fn bits(&self) -> u8 {
        self.bits
    }

    /// Whether the format is floating-point (no rounding on quantize).
    pub fn is_floating_point(&self) -> bool {
        self.is_floating_point
    }

    /// Representable `[min, max]` range.
    pub fn info(&self) -> DTypeInfo {
        DTypeInfo {
            min: self.min,
            max: self.max,
        }
    }

    /// Largest representable magnitude, the absmax scale divisor.
    pub fn max_magnitude(&self) -> f32 {
        self.max
    }

    /// Look a format up by its canonical name.
    pub fn by_name(name: &str) -> Option<QType> {
        ALL_QTYPES.into_iter().find(|q| q.name == name)
    }
}

impl fmt::Display for QType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// Representable `[min, max]` of a quantized type.
pub fn dtype_info(qtype: QType) -> DTypeInfo {
    qtype.info()
}
