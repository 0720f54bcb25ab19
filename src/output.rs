use std::io::IsTerminal;

use source_graph::flatten::NodeMap;
use source_graph::query::find::{FindResult, kind_to_str};
use source_graph::query::show::{Implementation, NodeDetails};
use source_graph::query::stats::GraphStats;

use crate::cli::OutputFormat;

fn bold(s: &str) -> String {
    if std::io::stdout().is_terminal() {
        format!("\x1b[1m{s}\x1b[0m")
    } else {
        s.to_string()
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) {
    println!("{}", serde_json::to_string_pretty(value).unwrap_or_default());
}

/// Format and print find results to stdout according to the selected output format.
pub fn format_find_results(results: &[FindResult], format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for r in results {
                match &r.file_path {
                    Some(file) => println!("{} {} {}", kind_to_str(r.kind), r.qualified_name, file),
                    None => println!("{} {}", kind_to_str(r.kind), r.qualified_name),
                }
            }
            println!("{} nodes found", results.len());
        }

        OutputFormat::Table => {
            let name_w = results
                .iter()
                .map(|r| r.qualified_name.len())
                .max()
                .unwrap_or(4)
                .max(4);

            println!(
                "{}",
                bold(&format!("{:<name_w$}  {:<9}  {}", "NAME", "KIND", "FILE"))
            );
            println!("{}", "-".repeat(name_w + 17));
            for r in results {
                let mut kind = kind_to_str(r.kind).to_string();
                if r.is_abstract {
                    kind.push('*');
                }
                println!(
                    "{:<name_w$}  {:<9}  {}",
                    r.qualified_name,
                    kind,
                    r.file_path.as_deref().unwrap_or("-"),
                );
            }
        }

        OutputFormat::Json => {
            let json_results: Vec<serde_json::Value> = results
                .iter()
                .map(|r| {
                    serde_json::json!({
                        "qualifiedName": r.qualified_name,
                        "kind": kind_to_str(r.kind),
                        "file": r.file_path,
                        "exported": r.is_exported,
                        "abstract": r.is_abstract,
                    })
                })
                .collect();
            print_json(&json_results);
        }
    }
}

/// Format and print merged-graph stats to stdout according to the selected output format.
pub fn format_stats(stats: &GraphStats, format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            println!("nodes {} edges {}", stats.node_count, stats.edge_count);
            println!(
                "classes {} interfaces {} types {} variables {} opaque {}",
                stats.classes, stats.interfaces, stats.type_aliases, stats.variables, stats.opaque,
            );
            println!(
                "extends-class {} implements-interface {} extends-interface {} extends-type {} has-type {}",
                stats.extends_class,
                stats.implements_interface,
                stats.extends_interface,
                stats.extends_type,
                stats.has_type,
            );
            println!(
                "linked {} roots {} leaves {}",
                stats.linked, stats.roots, stats.leaves
            );
        }

        OutputFormat::Table => {
            println!("{}", bold("=== Source Graph ==="));
            println!("Nodes:  {}", stats.node_count);
            println!("Edges:  {}", stats.edge_count);
            println!();
            println!("{}", bold("--- Declarations ---"));
            println!("  Classes:      {}", stats.classes);
            println!("  Interfaces:   {}", stats.interfaces);
            println!("  Type Aliases: {}", stats.type_aliases);
            println!("  Variables:    {}", stats.variables);
            println!("  Opaque:       {}", stats.opaque);
            println!();
            println!("{}", bold("--- Relations ---"));
            println!("  extends class:        {}", stats.extends_class);
            println!("  implements interface: {}", stats.implements_interface);
            println!("  extends interface:    {}", stats.extends_interface);
            println!("  extends type:         {}", stats.extends_type);
            println!("  has type:             {}", stats.has_type);
            println!();
            println!("{}", bold("--- Shape ---"));
            println!("  Linked: {}", stats.linked);
            println!("  Roots:  {}", stats.roots);
            println!("  Leaves: {}", stats.leaves);
        }

        OutputFormat::Json => print_json(stats),
    }
}

fn names(map: &NodeMap) -> String {
    if map.is_empty() {
        return "-".to_string();
    }
    map.keys().cloned().collect::<Vec<_>>().join(",")
}

/// Format and print one node's details.
pub fn format_node_details(details: &NodeDetails, format: &OutputFormat) {
    let node = &details.node;
    match format {
        OutputFormat::Compact | OutputFormat::Table => {
            let heading = format!("{} {}", kind_to_str(node.kind()), node.qualified_name);
            if matches!(format, OutputFormat::Table) {
                println!("{}", bold(&heading));
            } else {
                println!("{}", heading);
            }
            if let Some(decl) = &node.declaration {
                if let Some(file) = &decl.file_path {
                    println!("file {}", file);
                }
                let mut flags = Vec::new();
                if decl.is_abstract {
                    flags.push("abstract");
                }
                if !decl.is_exported {
                    flags.push("private");
                }
                if details.linked {
                    flags.push("linked");
                }
                if !flags.is_empty() {
                    println!("flags {}", flags.join(","));
                }
                if !decl.type_parameters.is_empty() {
                    println!("type-params {}", decl.type_parameters.join(","));
                }
                for p in &decl.properties {
                    let optional = if p.optional { "?" } else { "" };
                    println!("property {}{}: {}", p.name, optional, p.type_name);
                }
                for m in &decl.methods {
                    let params: Vec<String> = m
                        .parameters
                        .iter()
                        .map(|p| format!("{}: {}", p.name, p.type_name))
                        .collect();
                    let prefix = if m.is_async { "async " } else { "" };
                    println!(
                        "method {}{}({}): {}",
                        prefix,
                        m.name,
                        params.join(", "),
                        m.return_type
                    );
                }
            } else {
                println!("opaque (defining package not loaded)");
            }
            println!("parents {}", names(&node.direct_parents));
            println!("all-parents {}", names(&node.all_parents));
            println!("root-parents {}", names(&node.root_parents));
            println!("children {}", names(&node.direct_children));
            println!("all-children {}", names(&node.all_children));
            println!("base-children {}", names(&node.base_children));
            for (parent, args) in &node.type_parameters {
                let args: Vec<&str> = args.iter().map(|a| a.qualified_name.as_str()).collect();
                println!("binds {}<{}>", parent, args.join(", "));
            }
        }

        OutputFormat::Json => print_json(details),
    }
}

/// Format and print the base children of a node.
pub fn format_implementations(parent: &str, found: &[Implementation], format: &OutputFormat) {
    match format {
        OutputFormat::Compact => {
            for i in found {
                let state = if i.resolvable {
                    "resolvable"
                } else if i.is_abstract {
                    "abstract"
                } else if i.kind.is_none() {
                    "opaque"
                } else {
                    "unlinked"
                };
                println!("{} {} {}", kind_to_str(i.kind), i.qualified_name, state);
            }
            println!("{} implementations of {}", found.len(), parent);
        }

        OutputFormat::Table => {
            let name_w = found
                .iter()
                .map(|i| i.qualified_name.len())
                .max()
                .unwrap_or(4)
                .max(4);
            println!(
                "{}",
                bold(&format!(
                    "{:<name_w$}  {:<9}  {:<6}  {}",
                    "NAME", "KIND", "LINKED", "RESOLVABLE"
                ))
            );
            println!("{}", "-".repeat(name_w + 31));
            for i in found {
                println!(
                    "{:<name_w$}  {:<9}  {:<6}  {}",
                    i.qualified_name,
                    kind_to_str(i.kind),
                    if i.linked { "yes" } else { "no" },
                    if i.resolvable { "yes" } else { "no" },
                );
            }
        }

        OutputFormat::Json => print_json(found),
    }
}
