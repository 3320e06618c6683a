//! Client-side view pipeline: filter, search, sort and summary over a snapshot

use crate::api::Snapshot;
use clap::ValueEnum;
use pvedash_proxy::{GuestStatus, VirtualMachine, VmFilter};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// Filters chosen by the user. `server` uses the proxy's semantics
/// (AND across dimensions, OR within labels); `search` is free text.
#[derive(Debug, Clone, Default)]
pub struct ViewFilter {
    pub server: VmFilter,
    pub search: String,
}

impl ViewFilter {
    pub fn matches(&self, vm: &VirtualMachine) -> bool {
        self.server.matches(vm) && matches_search(vm, &self.search)
    }
}

/// Case-insensitive substring match on name, vmid or host
pub fn matches_search(vm: &VirtualMachine, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    let needle = query.to_lowercase();
    vm.name.to_lowercase().contains(&needle)
        || vm.vmid.to_string().contains(&needle)
        || vm.node.to_lowercase().contains(&needle)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Column {
    Id,
    Name,
    Status,
    Type,
    Node,
    Cpu,
    Memory,
    Disk,
    Uptime,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Direction {
    #[default]
    Asc,
    Desc,
}

/// Single-column sort
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortSpec {
    pub column: Column,
    pub direction: Direction,
}

impl Column {
    fn compare(&self, a: &VirtualMachine, b: &VirtualMachine) -> Ordering {
        match self {
            Column::Id => a.vmid.cmp(&b.vmid),
            Column::Name => a.name.cmp(&b.name),
            Column::Status => a.status.as_str().cmp(b.status.as_str()),
            Column::Type => a.kind.as_str().cmp(b.kind.as_str()),
            Column::Node => a.node.cmp(&b.node),
            Column::Cpu => a.cpu.unwrap_or(0.0).total_cmp(&b.cpu.unwrap_or(0.0)),
            Column::Memory => a.mem.unwrap_or(0).cmp(&b.mem.unwrap_or(0)),
            Column::Disk => a.disk.unwrap_or(0).cmp(&b.disk.unwrap_or(0)),
            Column::Uptime => a.uptime.unwrap_or(0).cmp(&b.uptime.unwrap_or(0)),
        }
    }
}

/// Stable sort; without a sort the upstream order is kept.
pub fn sort_rows(rows: &mut [&VirtualMachine], sort: Option<SortSpec>) {
    let Some(spec) = sort else { return };
    rows.sort_by(|a, b| {
        let ord = spec.column.compare(a, b);
        match spec.direction {
            Direction::Asc => ord,
            Direction::Desc => ord.reverse(),
        }
    });
}

/// Rows to display, in display order
pub fn visible_rows<'a>(
    vms: &'a [VirtualMachine],
    filter: &ViewFilter,
    sort: Option<SortSpec>,
) -> Vec<&'a VirtualMachine> {
    let mut rows: Vec<&VirtualMachine> = vms.iter().filter(|vm| filter.matches(vm)).collect();
    sort_rows(&mut rows, sort);
    rows
}

/// Aggregates over the unfiltered snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Summary {
    pub total: usize,
    pub running: usize,
    pub stopped: usize,
    pub hosts: usize,
    pub labels: usize,
}

impl Summary {
    pub fn from_snapshot(snapshot: &Snapshot) -> Self {
        let vms = &snapshot.vms;
        Self {
            total: vms.len(),
            running: vms.iter().filter(|vm| vm.status == GuestStatus::Running).count(),
            stopped: vms.iter().filter(|vm| vm.status == GuestStatus::Stopped).count(),
            hosts: snapshot.hosts.len(),
            labels: vms.iter().flat_map(|vm| vm.tags.iter()).collect::<BTreeSet<_>>().len(),
        }
    }
}

/// `Showing 2 of 6 VMs on node "host1" with tags: prod, web`
pub fn footer(visible: usize, total: usize, filter: &ViewFilter) -> String {
    let mut line = format!("Showing {visible} of {total} VMs");
    if let Some(node) = &filter.server.host {
        line.push_str(&format!(" on node \"{node}\""));
    }
    if let Some(labels) = &filter.server.labels {
        line.push_str(&format!(" with tags: {}", labels.iter().collect::<Vec<_>>().join(", ")));
    }
    line
}
