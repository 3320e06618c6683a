//! CSV export of the visible rows, with humanized values

use crate::format::{format_bytes, format_percentage, format_uptime, usage_fraction};
use pvedash_proxy::VirtualMachine;
use std::io::{self, Write};

pub const HEADER: [&str; 12] = [
    "ID", "Name", "Status", "Type", "Node", "CPU", "Memory", "Memory %", "Disk", "Disk %", "Uptime", "Tags",
];

/// Every field quoted, embedded quotes doubled (RFC 4180)
fn quote(field: &str) -> String {
    format!("\"{}\"", field.replace('"', "\"\""))
}

fn write_record<W: Write>(out: &mut W, fields: &[String]) -> io::Result<()> {
    let line = fields.iter().map(|f| quote(f)).collect::<Vec<_>>().join(",");
    writeln!(out, "{line}")
}

pub fn record(vm: &VirtualMachine) -> Vec<String> {
    vec![
        vm.vmid.to_string(),
        vm.name.clone(),
        vm.status.as_str().to_string(),
        vm.kind.as_str().to_string(),
        vm.node.clone(),
        format_percentage(vm.cpu),
        format!("{} / {}", format_bytes(vm.mem), format_bytes(vm.maxmem)),
        format_percentage(Some(usage_fraction(vm.mem, vm.maxmem))),
        format!("{} / {}", format_bytes(vm.disk), format_bytes(vm.maxdisk)),
        format_percentage(Some(usage_fraction(vm.disk, vm.maxdisk))),
        format_uptime(vm.uptime),
        vm.tags.iter().map(String::as_str).collect::<Vec<_>>().join("; "),
    ]
}

pub fn write_csv<W: Write>(out: &mut W, rows: &[&VirtualMachine]) -> io::Result<()> {
    let header: Vec<String> = HEADER.iter().map(|h| h.to_string()).collect();
    write_record(out, &header)?;
    for vm in rows {
        write_record(out, &record(vm))?;
    }
    out.flush()
}
