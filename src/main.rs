use std::env;
use std::process;
use tail_reader::{ChangeKind, watch_tail};
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = env::args().collect();

    if args.len() < 2 || args.len() > 3 {
        eprintln!("Usage: {} <file_path> [line_count]", args[0]);
        process::exit(1);
    }

    let file_path = &args[1];
    let line_count = match args.get(2) {
        Some(raw) => match raw.parse::<usize>() {
            Ok(n) if n >= 1 => n,
            _ => {
                eprintln!("line_count must be a positive integer, got '{raw}'");
                process::exit(1);
            }
        },
        None => 10,
    };

    match watch_tail(file_path, line_count).await {
        Ok(mut changes) => {
            println!("Watching file: {}", file_path);
            while let Some(record) = changes.next().await {
                match record.kind {
                    ChangeKind::Deleted => {
                        println!("-- {} deleted --", record.path.display());
                    }
                    _ => {
                        for line in &record.lines {
                            println!("{:>6}  {}", line.number, line.content);
                        }
                        println!("--");
                    }
                }
            }
        }
        Err(e) => {
            eprintln!("Error setting up file watcher: {}", e);
            process::exit(1);
        }
    }
}
