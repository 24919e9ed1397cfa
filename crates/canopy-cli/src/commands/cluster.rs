//! In-process cluster with an interactive prompt.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::{Context, Result};
use bytes::Bytes;
use canopy_client::MulticastClient;
use canopy_sim::{SimCluster, SimConfig, SimTransport};
use canopy_topology::{Topology, from_file};
use canopy_types::GroupId;

pub fn run(topology_path: &str, redundancy: u32, threshold: u32) -> Result<()> {
    let topology = Arc::new(
        from_file(topology_path)
            .with_context(|| format!("failed to load topology from {topology_path}"))?,
    );
    let config = SimConfig {
        redundancy,
        min_receive_count: threshold,
        ..SimConfig::default()
    };
    let cluster = SimCluster::new(Arc::clone(&topology), config);
    let client = MulticastClient::new(topology, Arc::new(cluster.client_transport()));

    println!(
        "cluster up: {} groups, redundancy {redundancy}, threshold {threshold}",
        cluster.topology().len()
    );
    println!("type `.help` for commands");

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let mut line = String::new();
    loop {
        print!("canopy> ");
        io::stdout().flush()?;

        line.clear();
        if reader.read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        match input {
            "" => {}
            ".exit" | ".quit" => break,
            ".help" => print_help(),
            ".topology" => print_topology(cluster.topology()),
            _ => submit(&client, input),
        }
    }

    println!("bye");
    Ok(())
}

fn submit(client: &MulticastClient<SimTransport>, input: &str) {
    let Some((targets_part, content)) = input.split_once(' ') else {
        println!("usage: <targets,comma-separated> <content>   e.g. `1,2 hello`");
        return;
    };
    let targets = match parse_targets(targets_part) {
        Ok(targets) => targets,
        Err(err) => {
            println!("error: {err:#}");
            return;
        }
    };

    match client.submit(targets, Bytes::copy_from_slice(content.as_bytes())) {
        Ok((request, response)) => {
            println!("request {}", request.id);
            match serde_json::to_string_pretty(&response) {
                Ok(json) => println!("{json}"),
                Err(err) => println!("error: {err}"),
            }
        }
        Err(err) => println!("error: {err}"),
    }
}

fn parse_targets(text: &str) -> Result<Vec<GroupId>> {
    text.split(',')
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .map(|part| {
            part.parse::<u64>()
                .map(GroupId::new)
                .with_context(|| format!("invalid group id `{part}`"))
        })
        .collect()
}

fn print_topology(topology: &Topology) {
    for group in topology.groups() {
        if let Ok(children) = topology.children_of(group) {
            let list = children
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join(", ");
            println!("  {group} -> [{list}]");
        }
    }
}

fn print_help() {
    println!("  <targets> <content>   submit a request, e.g. `1,3 hello`");
    println!("  .topology             show the group tree");
    println!("  .help                 show this help");
    println!("  .exit                 stop the cluster and leave");
}
