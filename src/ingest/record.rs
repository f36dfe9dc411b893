use std::net::IpAddr;

use csv::StringRecord;
use serde_derive::Deserialize;

use crate::types::af::CanonicalAddress;
use crate::types::errors::FibError;

use super::InputFormat;

//------------ Observation ---------------------------------------------------

/// One link observation: a probe towards `destination` went through
/// `near` and then through `next_hop`.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Observation {
    pub near: CanonicalAddress,
    pub next_hop: CanonicalAddress,
    pub destination: CanonicalAddress,
}

impl Observation {
    /// Decode one CSV row in `format`. Fields are matched by position,
    /// the header (if any) is not consulted.
    pub fn from_record(
        record: &StringRecord,
        format: InputFormat,
    ) -> Result<Self, FibError> {
        if record.len() != format.columns() {
            return Err(FibError::MalformedRecord(format!(
                "expected {} columns, found {}",
                format.columns(),
                record.len()
            )));
        }
        match format {
            InputFormat::Nfp => {
                record.deserialize::<NfpRecord>(None)?.try_into()
            }
            InputFormat::Links => {
                record.deserialize::<LinkRecord>(None)?.try_into()
            }
        }
    }
}

// An empty column, or the unspecified address, means the hop did not
// answer.
fn required(addr: Option<IpAddr>) -> Result<CanonicalAddress, FibError> {
    match addr {
        Some(addr) if !addr.is_unspecified() => Ok(addr.into()),
        _ => Err(FibError::NilAddress),
    }
}

//------------ NfpRecord -----------------------------------------------------

/// A row of a near/far/probe file: `near_addr,far_addr,probe_dst_addr`.
#[derive(Clone, Debug, Deserialize)]
pub struct NfpRecord {
    pub near_addr: Option<IpAddr>,
    pub far_addr: Option<IpAddr>,
    pub probe_dst_addr: Option<IpAddr>,
}

impl TryFrom<NfpRecord> for Observation {
    type Error = FibError;

    fn try_from(record: NfpRecord) -> Result<Self, Self::Error> {
        Ok(Observation {
            near: required(record.near_addr)?,
            next_hop: required(record.far_addr)?,
            destination: required(record.probe_dst_addr)?,
        })
    }
}

//------------ LinkRecord ----------------------------------------------------

/// A row of a full links table, as produced by a traceroute measurement
/// pipeline. Only the near, far and probe destination addresses end up
/// in the FIB, but every integer column has to parse for the row to be
/// accepted.
#[derive(Clone, Debug, Deserialize)]
pub struct LinkRecord {
    pub probe_protocol: u8,
    pub probe_src_addr: Option<IpAddr>,
    pub probe_dst_prefix: Option<IpAddr>,
    pub probe_dst_addr: Option<IpAddr>,
    pub probe_src_port: u16,
    pub probe_dst_port: u16,
    pub near_round: u32,
    pub far_round: u32,
    pub near_ttl: u8,
    pub far_ttl: u8,
    pub near_addr: Option<IpAddr>,
    pub far_addr: Option<IpAddr>,
}

impl TryFrom<LinkRecord> for Observation {
    type Error = FibError;

    fn try_from(record: LinkRecord) -> Result<Self, Self::Error> {
        Ok(Observation {
            near: required(record.near_addr)?,
            next_hop: required(record.far_addr)?,
            destination: required(record.probe_dst_addr)?,
        })
    }
}
