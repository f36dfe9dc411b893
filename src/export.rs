//! Writers that turn a [Fib] into text.
//!
//! Near addresses come out in ascending order, the prefixes of one
//! forwarding table in pre-order of its trie: a network before its
//! more-specifics. Prefixes are printed with the length they were stored
//! with.
//!
//! The CSV writers quote every field, so a summary looks like:
//!
//! ```text
//! "address","num_networks","num_hosts"
//! "192.0.2.1","2","256"
//! ```

use std::io;

use csv::{QuoteStyle, WriterBuilder};
use serde_derive::Serialize;

use crate::fib::Fib;
use crate::types::af::IPV6_BITS;

//------------ Summary -------------------------------------------------------

const SUMMARY_HEADER: [&str; 3] = ["address", "num_networks", "num_hosts"];

#[derive(Debug, Serialize)]
struct SummaryRow {
    address: String,
    num_networks: usize,
    num_hosts: u128,
}

/// Write one row per near address with the number of distinct
/// destination networks in its table, and the number of hosts in a
/// network with `postfix_len` host bits.
pub fn write_summary<W: io::Write>(
    fib: &Fib,
    postfix_len: u8,
    writer: W,
) -> io::Result<()> {
    let num_hosts = 1_u128.checked_shl(postfix_len.into()).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::InvalidInput,
            format!(
                "postfix length {} exceeds {}",
                postfix_len,
                IPV6_BITS - 1
            ),
        )
    })?;

    // The header is written by hand, so that an empty FIB still gets one.
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .has_headers(false)
        .from_writer(writer);
    wtr.write_record(SUMMARY_HEADER)?;
    for (near, table) in fib.iter() {
        wtr.serialize(SummaryRow {
            address: near.to_string(),
            num_networks: table.len(),
            num_hosts,
        })?;
    }
    wtr.flush()
}

//------------ CSV -----------------------------------------------------------

/// Write one line per (near address, destination network, next hop)
/// triple, without a header.
pub fn write_csv<W: io::Write>(fib: &Fib, writer: W) -> io::Result<()> {
    let mut wtr = WriterBuilder::new()
        .quote_style(QuoteStyle::Always)
        .has_headers(false)
        .from_writer(writer);
    for (near, table) in fib.iter() {
        let near = near.to_string();
        for route in table.iter() {
            let prefix = route.prefix().to_string();
            for next_hop in route.next_hops.iter() {
                wtr.write_record([
                    near.as_str(),
                    prefix.as_str(),
                    next_hop.to_string().as_str(),
                ])?;
            }
        }
    }
    wtr.flush()
}

//------------ Dump ----------------------------------------------------------

/// Write the human readable dump: every near address on a line of its
/// own, followed by one indented `prefix -> {next hops}` line per
/// destination network.
pub fn write_dump<W: io::Write>(fib: &Fib, mut writer: W) -> io::Result<()> {
    for (near, table) in fib.iter() {
        writeln!(writer, "{}:", near)?;
        for route in table.iter() {
            writeln!(writer, "\t{}", route)?;
        }
    }
    writer.flush()
}
