use charityscraper::bcp;
use std::env;

fn main() -> anyhow::Result<()> {
    // Expect two arguments: the extract ZIP and an output folder
    let args: Vec<String> = env::args().collect();
    if args.len() != 3 {
        eprintln!("Usage: {} <extract.zip> <dest_dir>", args[0]);
        std::process::exit(1);
    }

    let report = bcp::import_zip(&args[1], &args[2])?;

    for table in &report.converted {
        println!("Converted: {}.bcp -> {}", table.table, table.path.display());
    }
    for table in &report.missing {
        println!("ERROR: Did not find {}.bcp in zip file", table);
    }
    for (table, err) in &report.failed {
        println!("ERROR: {}: {}", table, err);
    }

    if !report.failed.is_empty() {
        std::process::exit(2);
    }
    Ok(())
}
