use std::env;
use std::fs;
use std::path::PathBuf;

use quickdic::{Dictionary, DictionaryInfo, Entry};

fn main() {
    env_logger::init();
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-quickdic-file>", args[0]);
        eprintln!("       {} --scan <directory>", args[0]);
        std::process::exit(1);
    }

    if args[1] == "--scan" {
        let Some(dir) = args.get(2) else {
            eprintln!("ERROR: --scan requires a directory argument.");
            std::process::exit(1);
        };
        scan_directory(dir);
        return;
    }

    print_dictionary(&args[1]);
}

/// Best-effort enumeration of every readable dictionary in a directory.
fn scan_directory(dir: &str) {
    let entries = match fs::read_dir(dir) {
        Ok(entries) => entries,
        Err(e) => {
            eprintln!("ERROR: Cannot read directory {}: {}", dir, e);
            std::process::exit(1);
        }
    };

    let paths: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .map(|entry| entry.path())
        .filter(|path| path.is_file())
        .collect();

    let infos = DictionaryInfo::scan_many(&paths);
    println!("Found {} readable dictionaries in {}", infos.len(), dir);
    for info in infos {
        println!(
            "  {} ({} bytes): {}",
            info.filename.as_deref().unwrap_or("?"),
            info.uncompressed_bytes.unwrap_or(0),
            info.description
        );
        for index_info in &info.index_infos {
            println!(
                "    index {} '{}': {} tokens",
                index_info.short_name, index_info.long_name, index_info.num_tokens
            );
        }
    }
}

fn print_dictionary(path: &str) {
    println!("Reading dictionary file: {}", path);
    println!("{}", "=".repeat(60));

    let dict = match Dictionary::open_path(path) {
        Ok(dict) => dict,
        Err(e) => {
            eprintln!("\nERROR: Failed to read dictionary file");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("\nDictionary Information:");
    println!("  Version: {}", dict.version);
    println!("  Created: {} (millis since epoch)", dict.creation_millis);
    println!("  Description: {}", dict.description);

    println!("\nSources:");
    for source in &dict.sources {
        println!("  {} ({} entries)", source.name, source.num_entries);
    }

    println!("\nStatistics:");
    println!("  Pair entries: {}", dict.pair_entries.len());
    println!("  Text entries: {}", dict.text_entries.len());
    println!("  Html entries: {}", dict.html_entries.len());
    println!("  Indices: {}", dict.indices.len());

    for i in 0..dict.indices.len() {
        let index = match dict.indices.get(i) {
            Ok(index) => index,
            Err(e) => {
                eprintln!("ERROR: Failed to read index {}: {}", i, e);
                std::process::exit(1);
            }
        };
        println!(
            "\nIndex {} '{}': {} tokens",
            index.short_name,
            index.long_name,
            index.tokens.len()
        );
        for token in index.tokens.iter().take(10) {
            let preview: Vec<String> = token
                .refs
                .iter()
                .filter_map(|entry_ref| dict.resolve(*entry_ref).ok())
                .map(|entry| match entry {
                    Entry::Pair(pair) => pair
                        .pairs
                        .first()
                        .map(|p| format!("{} = {}", p.lang1, p.lang2))
                        .unwrap_or_default(),
                    Entry::Text(text) => text.text,
                    Entry::Html(html) => html.title,
                })
                .collect();
            println!("  {} -> {}", token.token, preview.join("; "));
        }
        if index.tokens.len() > 10 {
            println!("  ... and {} more", index.tokens.len() - 10);
        }
    }
}
