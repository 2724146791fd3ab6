use crate::time::Delta;

macro_rules! unit {
    ($name: ident) => {
        #[derive(
            Debug,
            Default,
            Copy,
            Clone,
            PartialOrd,
            Ord,
            PartialEq,
            Eq,
            Hash,
            derive_more::Display,
            serde::Serialize,
            serde::Deserialize,
        )]
        pub struct $name(u64);

        impl $name {
            pub const ZERO: $name = Self::new(0);

            pub const fn new(value: u64) -> Self {
                Self(value)
            }

            pub const fn into_u64(self) -> u64 {
                self.0
            }

            pub const fn into_f64(self) -> f64 {
                self.0 as f64
            }
        }
    };
}

unit!(Bytes);

unit!(BitsPerSec);
unit!(Gbps);

// Link rate in bytes per virtual-time unit
unit!(BytesPerUnit);

impl BytesPerUnit {
    /// The default server rate: 10 Gbps with the virtual-time unit read as one microsecond.
    pub const DEFAULT: BytesPerUnit = Gbps::new(10).into_bytes_per_us();

    /// The time it takes to push `size` bytes through a link of this rate.
    pub fn service_time(&self, size: Bytes) -> Delta {
        assert!(*self != BytesPerUnit::ZERO);
        if size == Bytes::ZERO {
            return Delta::ZERO;
        }
        Delta::from_units(size.into_f64() / self.into_f64())
    }
}

impl BitsPerSec {
    /// Reads this rate with the virtual-time unit taken as one microsecond.
    pub const fn into_bytes_per_us(self) -> BytesPerUnit {
        BytesPerUnit::new(self.0 / 8 / 1_000_000)
    }
}

impl Gbps {
    pub const fn into_bps(self) -> BitsPerSec {
        let val = self.0 * 1_000_000_000;
        BitsPerSec::new(val)
    }

    pub const fn into_bytes_per_us(self) -> BytesPerUnit {
        self.into_bps().into_bytes_per_us()
    }
}

impl From<Gbps> for BytesPerUnit {
    fn from(val: Gbps) -> Self {
        val.into_bytes_per_us()
    }
}
