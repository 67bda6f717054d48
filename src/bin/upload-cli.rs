use std::path::PathBuf;

use clap::Parser;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use tokio_util::io::ReaderStream;

#[derive(Parser)]
#[command(name = "upload-cli")]
#[command(about = "Submit a file to an upload relay", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    /// 14-digit transaction number
    #[arg(long)]
    trans_num: String,

    #[arg(long)]
    port_of_entry: String,

    /// Cargo control number, 5 to 25 characters
    #[arg(long)]
    ccd_num: String,

    /// ETA date, e.g. 2023-01-31
    #[arg(long)]
    eta_date: Option<String>,

    /// ETA time, e.g. 12:30
    #[arg(long)]
    eta_time: Option<String>,

    /// File to upload
    file: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let file = tokio::fs::File::open(&cli.file).await?;
    let len = file.metadata().await?.len();
    let file_name = cli
        .file
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());

    // The relay reads fields in order and stops at the file part.
    let mut form = Form::new()
        .text("trans_num", cli.trans_num)
        .text("port_of_entry", cli.port_of_entry)
        .text("ccd_num", cli.ccd_num);
    if let Some(date) = cli.eta_date {
        form = form.text("eta_date", date);
    }
    if let Some(time) = cli.eta_time {
        form = form.text("eta_time", time);
    }
    let part = Part::stream_with_length(reqwest::Body::wrap_stream(ReaderStream::new(file)), len)
        .file_name(file_name);
    form = form.part("userfile", part);

    let res = reqwest::Client::new()
        .post(&cli.url)
        .multipart(form)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;

    if status.is_success() {
        println!("{}", text);
        return Ok(());
    }

    eprintln!("Error: relay returned status {}", status);
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => eprintln!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => eprintln!("Response: {}", text),
    }
    std::process::exit(1);
}
