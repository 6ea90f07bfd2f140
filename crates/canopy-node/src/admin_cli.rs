//! canopy-admin CLI tool
//!
//! Talks to a running canopy-node over its admin socket.
//!
//! Usage:
//!   canopy-admin emit <event> <data> <target>...
//!   canopy-admin connections
//!   canopy-admin update-node <node.json>
//!   canopy-admin restart
//!   canopy-admin ping

use canopy_node::admin_socket::{default_socket_path, AdminCommand, AdminResponse};
use canopy_node::{Node, Targets, WILDCARD};
use std::io::{BufRead, BufReader, Write};
use std::os::unix::net::UnixStream;

fn print_usage() {
    eprintln!("canopy-admin - Control a running Canopy node");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  canopy-admin emit <event> <data> <target>...  Emit an event into the tree");
    eprintln!("  canopy-admin connections                      List live connections");
    eprintln!("  canopy-admin update-node <node.json>          Store a node record and reload");
    eprintln!("  canopy-admin restart                          Reload the topology");
    eprintln!("  canopy-admin ping                             Check if daemon is running");
    eprintln!();
    eprintln!("Targets:");
    eprintln!("  <name>        a node");
    eprintln!("  group:<name>  every member of a group");
    eprintln!("  tag:<name>    every node carrying a tag");
    eprintln!("  {}             every node", WILDCARD);
    eprintln!();
    eprintln!("Environment:");
    eprintln!("  CANOPY_ADMIN_SOCKET  Path to admin socket (default: ./canopy-data/admin.sock)");
}

fn parse_targets(args: &[String]) -> Targets {
    let mut targets = Targets::default();
    for arg in args {
        if let Some(group) = arg.strip_prefix("group:") {
            targets.groups.push(group.to_string());
        } else if let Some(tag) = arg.strip_prefix("tag:") {
            targets.tags.push(tag.to_string());
        } else {
            targets.nodes.push(arg.clone());
        }
    }
    targets
}

fn send_command(cmd: AdminCommand) -> Result<AdminResponse, String> {
    let socket_path = default_socket_path();

    let mut stream = UnixStream::connect(&socket_path).map_err(|e| {
        format!(
            "Failed to connect to canopy-node at {:?}: {}\n\
             Is the canopy-node running?",
            socket_path, e
        )
    })?;

    let cmd_json = serde_json::to_string(&cmd).map_err(|e| e.to_string())?;
    writeln!(stream, "{}", cmd_json).map_err(|e| e.to_string())?;

    let mut reader = BufReader::new(&stream);
    let mut response_line = String::new();
    reader
        .read_line(&mut response_line)
        .map_err(|e| e.to_string())?;

    serde_json::from_str(&response_line).map_err(|e| format!("Invalid response: {}", e))
}

fn fail(message: &str) -> ! {
    eprintln!("Error: {}", message);
    std::process::exit(1);
}

fn main() {
    let args: Vec<String> = std::env::args().collect();

    if args.len() < 2 {
        print_usage();
        std::process::exit(1);
    }

    let cmd = match args[1].as_str() {
        "emit" => {
            if args.len() < 5 {
                fail("emit requires <event> <data> and at least one target");
            }
            AdminCommand::Emit {
                event: args[2].clone(),
                data: args[3].clone(),
                targets: parse_targets(&args[4..]),
            }
        }
        "connections" => AdminCommand::Connections,
        "update-node" => {
            if args.len() < 3 {
                fail("update-node requires a node JSON file");
            }
            let raw = std::fs::read_to_string(&args[2])
                .unwrap_or_else(|e| fail(&format!("cannot read {}: {}", args[2], e)));
            let node: Node = serde_json::from_str(&raw)
                .unwrap_or_else(|e| fail(&format!("invalid node record: {}", e)));
            AdminCommand::UpdateNode { node }
        }
        "restart" => AdminCommand::Restart,
        "ping" => AdminCommand::Ping,
        "-h" | "--help" | "help" => {
            print_usage();
            std::process::exit(0);
        }
        other => {
            eprintln!("Unknown command: {}", other);
            print_usage();
            std::process::exit(1);
        }
    };

    match send_command(cmd) {
        Ok(response) => match response {
            AdminResponse::Ok { message } => {
                println!("{}", message);
            }
            AdminResponse::Error { error } => fail(&error),
            AdminResponse::List { items } => {
                if items.is_empty() {
                    println!("(none)");
                } else {
                    for item in items {
                        println!("{}", item);
                    }
                }
            }
            AdminResponse::Pong => {
                println!("pong - canopy-node is running");
            }
        },
        Err(e) => {
            eprintln!("{}", e);
            std::process::exit(1);
        }
    }
}
