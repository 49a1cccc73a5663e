use anyhow::Context;
use file_list_reader::config::parse_args;
use file_list_reader::{list_files_with, print_bytes, FileListReader};
use log::*;
use tokio::io::AsyncWriteExt;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init();
    let config = parse_args(std::env::args_os())?;
    debug!("config: {:?}", config);

    if config.list {
        let files = list_files_with(&config.directory, &config.bounds(), &config.convention())
            .await
            .with_context(|| format!("listing {}", config.directory.display()))?;
        for file in files {
            println!("{}", file.display());
        }
        return Ok(());
    }

    let reader = FileListReader::with_convention(
        config.directory.clone(),
        config.bounds(),
        config.convention(),
    );
    let mut chunks = reader.into_chunk_stream(config.chunk_size.0);
    let mut stdout = tokio::io::stdout();
    let mut total: u64 = 0;
    while let Some(chunk) = chunks.next().await {
        let chunk = chunk.with_context(|| format!("streaming {}", config.directory.display()))?;
        total += chunk.len() as u64;
        stdout.write_all(&chunk).await.context("writing to stdout")?;
    }
    stdout.flush().await?;
    debug!("wrote {}", print_bytes(total as f64));
    Ok(())
}
