//------------ Config --------------------------------------------------------

//! Configuration options for a [Fib](super::Fib).
//!
//! A configuration is created by instantiating a [FibConfig], setting some
//! fields on it, and passing it in as an argument to
//! [with_config](super::Fib::with_config).
//!
//! ```
//! use routeinfo::{Fib, FibConfig};
//!
//! let config = FibConfig {
//!     capacity: 50_000,
//!     ..Default::default()
//! };
//! let fib = Fib::with_config(config);
//! assert_eq!(fib.config().default_prefix_len, 24);
//! ```

use crate::types::af::IPV4_BITS;
use crate::types::errors::FibError;

/// The capacity a [Fib](super::Fib) is created with, absent a configuration.
pub const DEFAULT_CAPACITY: usize = 1000;

/// The length destination networks are truncated to by
/// [insert_default](super::Fib::insert_default).
pub const DEFAULT_PREFIX_LEN: u8 = 24;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct FibConfig {
    /// The number of distinct near addresses to reserve room for. This is
    /// a sizing hint only.
    pub capacity: usize,
    /// The prefix length for destination networks, relative to the native
    /// family of the destination address.
    pub default_prefix_len: u8,
}

impl FibConfig {
    /// Check that `default_prefix_len` is usable for IPv4 destinations,
    /// and therefore for all destinations.
    pub fn validate(&self) -> Result<(), FibError> {
        if self.default_prefix_len > IPV4_BITS {
            return Err(FibError::InvalidPrefixLength {
                len: self.default_prefix_len,
                max: IPV4_BITS,
            });
        }
        Ok(())
    }
}

impl Default for FibConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            default_prefix_len: DEFAULT_PREFIX_LEN,
        }
    }
}
