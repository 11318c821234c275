//! Primitive writables
//!
//! Fixed-width values are big-endian; `VIntWritable`/`VLongWritable` use the
//! zero-compressed encoding from [`varint`](super::varint).

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use crate::buffer::{DataInputBuffer, DataOutputBuffer};
use crate::error::Result;
use crate::writable::Writable;

macro_rules! int_writable {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $write:ident, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(pub $ty);

        impl $name {
            pub fn new(value: $ty) -> Self {
                Self(value)
            }

            pub fn get(&self) -> $ty {
                self.0
            }

            pub fn set(&mut self, value: $ty) {
                self.0 = value;
            }
        }

        impl Writable for $name {
            fn type_name() -> String {
                stringify!($name).to_string()
            }

            fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
                out.$write(self.0);
                Ok(())
            }

            fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
                self.0 = input.$read()?;
                Ok(())
            }
        }

        impl From<$ty> for $name {
            fn from(value: $ty) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

int_writable!(
    /// Single signed byte
    ByteWritable, i8, write_i8, read_i8
);
int_writable!(
    /// 16-bit signed integer
    ShortWritable, i16, write_i16, read_i16
);
int_writable!(
    /// 32-bit signed integer
    IntWritable, i32, write_i32, read_i32
);
int_writable!(
    /// 64-bit signed integer
    LongWritable, i64, write_i64, read_i64
);
int_writable!(
    /// 32-bit signed integer, zero-compressed
    VIntWritable, i32, write_vint, read_vint
);
int_writable!(
    /// 64-bit signed integer, zero-compressed
    VLongWritable, i64, write_vlong, read_vlong
);
int_writable!(
    /// One byte, 0 or 1 on write; any non-zero byte reads as true
    BooleanWritable, bool, write_bool, read_bool
);

// =============================================================================
// Floating Point
// =============================================================================

// Floats order by `total_cmp` so they can be keys; equality follows the same
// order (so -0.0 != 0.0 and NaN == NaN with identical bits).
macro_rules! float_writable {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $write:ident, $read:ident) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name(pub $ty);

        impl $name {
            pub fn new(value: $ty) -> Self {
                Self(value)
            }

            pub fn get(&self) -> $ty {
                self.0
            }

            pub fn set(&mut self, value: $ty) {
                self.0 = value;
            }
        }

        impl Writable for $name {
            fn type_name() -> String {
                stringify!($name).to_string()
            }

            fn write(&self, out: &mut DataOutputBuffer) -> Result<()> {
                out.$write(self.0);
                Ok(())
            }

            fn read_fields(&mut self, input: &mut DataInputBuffer) -> Result<()> {
                self.0 = input.$read()?;
                Ok(())
            }
        }

        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.cmp(other) == Ordering::Equal
            }
        }

        impl Eq for $name {}

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.0.total_cmp(&other.0)
            }
        }

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.0.to_bits().hash(state);
            }
        }

        impl From<$ty> for $name {
            fn from(value: $ty) -> Self {
                Self(value)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

float_writable!(
    /// IEEE-754 single precision
    FloatWritable, f32, write_f32, read_f32
);
float_writable!(
    /// IEEE-754 double precision
    DoubleWritable, f64, write_f64, read_f64
);

// =============================================================================
// Null
// =============================================================================

/// Placeholder with an empty encoding
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NullWritable;

impl NullWritable {
    pub fn get() -> Self {
        NullWritable
    }
}

impl Writable for NullWritable {
    fn type_name() -> String {
        "NullWritable".to_string()
    }

    fn write(&self, _out: &mut DataOutputBuffer) -> Result<()> {
        Ok(())
    }

    fn read_fields(&mut self, _input: &mut DataInputBuffer) -> Result<()> {
        Ok(())
    }
}

impl fmt::Display for NullWritable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("(null)")
    }
}
