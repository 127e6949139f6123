//! Command-line front end: list a local or remote ZIP archive in natural
//! order, or step through its entries with neighbour prefetching.

use anyhow::{Context, Result, bail};
use clap::Parser;
use tokio::io::AsyncWriteExt;

use zipwindow::logging::init_tracing;
use zipwindow::{ArchiveSession, Cli};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.log_level());

    let mut session = ArchiveSession::open(&cli.file, &cli.config())
        .await
        .with_context(|| format!("couldn't open {}", cli.file))?;

    if cli.list || cli.verbose {
        list_entries(&session, cli.verbose);
    } else if cli.pipe {
        pipe_entries(&session, &cli).await?;
    } else {
        walk(&mut session, &cli).await?;
    }

    // Display network transfer statistics for HTTP sources
    if !cli.is_quiet() && cli.is_http_url() {
        let stats = session.cache_stats().await;
        eprintln!(
            "\nTotal bytes transferred: {} in {} requests ({} chunk hits, {} evictions)",
            format_size(session.transferred_bytes().unwrap_or(0)),
            session.requests().unwrap_or(0),
            stats.hits,
            stats.evictions,
        );
    }

    Ok(())
}

/// Print entry names in natural order, optionally with sizes.
fn list_entries(session: &ArchiveSession, verbose: bool) {
    if !verbose {
        for entry in session.entries() {
            println!("{}", entry.name);
        }
        return;
    }

    println!("{:>10}  {:>10}  {:>5}  {:<7}  Name", "Length", "Size", "Cmpr", "Method");
    println!("{}", "-".repeat(60));

    let (mut total, mut total_compressed) = (0u64, 0u64);
    for entry in session.entries() {
        println!(
            "{:>10}  {:>10}  {}  {:<7}  {}",
            entry.size,
            entry.compressed_size,
            ratio(entry.compressed_size, entry.size),
            entry.method.label(),
            entry.name
        );
        total += entry.size;
        total_compressed += entry.compressed_size;
    }

    println!("{}", "-".repeat(60));
    println!(
        "{:>10}  {:>10}  {}  {:<7}  {} files",
        total,
        total_compressed,
        ratio(total_compressed, total),
        "",
        session.len()
    );
}

/// Percentage saved by compression, formatted to five columns.
fn ratio(compressed: u64, size: u64) -> String {
    if size == 0 {
        return "   0%".to_string();
    }
    format!("{:>4}%", 100u64.saturating_sub(compressed.saturating_mul(100) / size))
}

/// Indices visited from the start entry, honouring direction and count.
fn visit_order(cli: &Cli, len: usize) -> Vec<usize> {
    let start = cli.start_index();
    let indices: Box<dyn Iterator<Item = usize>> = if cli.reverse {
        Box::new((0..=start).rev())
    } else {
        Box::new(start..len)
    };
    indices.take(cli.count.unwrap_or(usize::MAX)).collect()
}

/// Write raw entry contents to stdout.
async fn pipe_entries(session: &ArchiveSession, cli: &Cli) -> Result<()> {
    if cli.start_index() >= session.len() {
        bail!("entry {} out of range ({} entries)", cli.start, session.len());
    }

    let order = visit_order(cli, session.len());
    let show_names = order.len() > 1;
    let mut stdout = tokio::io::stdout();

    for index in order {
        let entry = &session.entries()[index];
        if show_names {
            stdout
                .write_all(format!("--- {} ---\n", entry.name).as_bytes())
                .await?;
        }
        let data = session
            .read_raw(index)
            .await
            .with_context(|| format!("couldn't extract {}", entry.name))?;
        stdout.write_all(&data).await?;
    }
    stdout.flush().await?;

    Ok(())
}

/// Step through entries via the prefetch window, the way a viewer would.
async fn walk(session: &mut ArchiveSession, cli: &Cli) -> Result<()> {
    let start = cli.start_index();
    if start >= session.len() {
        bail!("entry {} out of range ({} entries)", cli.start, session.len());
    }

    let mut asset = session.seek(start)?;
    let mut visited = 0;

    loop {
        let name = session.current_entry().name.clone();
        match asset.wait().await {
            Ok(page) => {
                if !cli.is_very_quiet() {
                    println!(
                        "[{}/{}] {} ({}, {})",
                        session.index() + 1,
                        session.len(),
                        page.name,
                        page.mime,
                        format_size(page.size as u64)
                    );
                }
                if cli.data_url {
                    println!("{}", page.data_url);
                }
            }
            // One bad entry does not stop the walk.
            Err(err) => eprintln!("Couldn't open {name} in zip file: {err}"),
        }

        visited += 1;
        if cli.count.is_some_and(|count| visited >= count) {
            break;
        }

        let next = if cli.reverse { session.prev() } else { session.next() };
        match next {
            Some(next) => asset = next,
            None => break,
        }
    }

    Ok(())
}

/// Format a byte size into a human-readable string.
fn format_size(size: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    match size {
        s if s >= GB => format!("{:.2} GB", s as f64 / GB as f64),
        s if s >= MB => format!("{:.2} MB", s as f64 / MB as f64),
        s if s >= KB => format!("{:.2} KB", s as f64 / KB as f64),
        s => format!("{s} bytes"),
    }
}
