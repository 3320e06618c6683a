//! Plain-text rendering of the dashboard for a terminal

use crate::format::{format_bytes, format_percentage, format_uptime, usage_fraction};
use crate::poller::DashboardState;
use crate::view::{footer, visible_rows, SortSpec, Summary, ViewFilter};
use pvedash_proxy::{Host, VirtualMachine};

const VM_HEADERS: [&str; 10] = ["ID", "Name", "Status", "Type", "Node", "CPU", "Memory", "Disk", "Uptime", "Tags"];
const HOST_HEADERS: [&str; 6] = ["Node", "Status", "CPU", "Memory", "Disk", "Uptime"];

fn vm_cells(vm: &VirtualMachine) -> Vec<String> {
    let cores = vm.cpus.map(|c| format!(" ({c} cores)")).unwrap_or_default();
    vec![
        vm.vmid.to_string(),
        vm.name.clone(),
        vm.status.as_str().to_string(),
        vm.kind.as_str().to_uppercase(),
        vm.node.clone(),
        format!("{}{}", format_percentage(vm.cpu), cores),
        format!(
            "{} / {} ({})",
            format_bytes(vm.mem),
            format_bytes(vm.maxmem),
            format_percentage(Some(usage_fraction(vm.mem, vm.maxmem)))
        ),
        format!(
            "{} / {} ({})",
            format_bytes(vm.disk),
            format_bytes(vm.maxdisk),
            format_percentage(Some(usage_fraction(vm.disk, vm.maxdisk)))
        ),
        format_uptime(vm.uptime),
        if vm.tags.is_empty() {
            "No tags".to_string()
        } else {
            vm.tags.iter().map(String::as_str).collect::<Vec<_>>().join(", ")
        },
    ]
}

fn host_cells(host: &Host) -> Vec<String> {
    vec![
        host.node.clone(),
        host.status.clone(),
        format_percentage(host.cpu),
        format!("{} / {}", format_bytes(host.mem), format_bytes(host.maxmem)),
        format!("{} / {}", format_bytes(host.disk), format_bytes(host.maxdisk)),
        format_uptime(host.uptime),
    ]
}

/// Left-aligned columns separated by two spaces
pub fn table(headers: &[&str], rows: &[Vec<String>]) -> String {
    let mut widths: Vec<usize> = headers.iter().map(|h| h.chars().count()).collect();
    for row in rows {
        for (i, cell) in row.iter().enumerate() {
            widths[i] = widths[i].max(cell.chars().count());
        }
    }

    let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
    let mut out = String::new();
    push_line(&mut out, headers.iter().copied(), &widths);
    push_line(&mut out, dashes.iter().map(String::as_str), &widths);
    for row in rows {
        push_line(&mut out, row.iter().map(String::as_str), &widths);
    }
    out
}

fn push_line<'a>(out: &mut String, cells: impl Iterator<Item = &'a str>, widths: &[usize]) {
    let line = cells
        .zip(widths)
        .map(|(cell, width)| format!("{:<width$}", cell, width = *width))
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

pub fn summary_line(summary: &Summary) -> String {
    format!(
        "Total VMs: {}  |  Running: {}  |  Stopped: {}  |  Nodes: {}  |  Tags: {}",
        summary.total, summary.running, summary.stopped, summary.hosts, summary.labels
    )
}

/// Whole screen: title, error banner, stats, table, footer
pub fn render_dashboard(state: &DashboardState, filter: &ViewFilter, sort: Option<SortSpec>) -> String {
    let mut out = String::from("Proxmox VM Dashboard\n\n");

    if let Some(error) = &state.error {
        out.push_str(&format!("Error: {error}\n"));
        out.push_str("Make sure the proxy is running and Proxmox credentials are configured.\n\n");
    }

    let Some(snapshot) = &state.snapshot else {
        out.push_str(if state.error.is_some() { "No data yet\n" } else { "Loading...\n" });
        return out;
    };

    out.push_str(&summary_line(&Summary::from_snapshot(snapshot)));
    out.push('\n');
    if !snapshot.labels.is_empty() {
        out.push_str(&format!("Available tags: {}\n", snapshot.labels.join(", ")));
    }
    out.push('\n');

    let rows = visible_rows(&snapshot.vms, filter, sort);
    if rows.is_empty() {
        out.push_str("No VMs found\n");
    } else {
        let cells: Vec<Vec<String>> = rows.iter().map(|vm| vm_cells(vm)).collect();
        out.push_str(&table(&VM_HEADERS, &cells));
    }

    out.push('\n');
    out.push_str(&footer(rows.len(), snapshot.vms.len(), filter));
    out.push('\n');
    out.push_str(&format!(
        "Last updated: {}\n",
        snapshot.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    out
}

pub fn render_hosts(hosts: &[Host]) -> String {
    let cells: Vec<Vec<String>> = hosts.iter().map(host_cells).collect();
    table(&HOST_HEADERS, &cells)
}
