use clap::{Parser, Subcommand};
use serde_json::Value;

#[derive(Parser)]
#[command(name = "proxy-cli")]
#[command(about = "Query a running media proxy from the terminal", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080/api")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Search anime by title, or videos with --video
    Search {
        query: String,
        #[arg(long)]
        video: bool,
    },
    /// Show one anime by AniList id
    Anime { id: i64 },
    /// Episodes airing in the next 24 hours
    Schedule,
    /// Top trending anime
    Trending,
    /// Most popular anime
    Popular,
    /// Editorial picks for the configured season
    Editorial,
    /// Resolve audio/video links for a media URL
    Download {
        url: String,
        #[arg(short, long, default_value = "mp3")]
        format: String,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let request = match cli.command {
        Commands::Search { query, video } => {
            let source = if video { "video" } else { "anime" };
            client
                .get(format!("{}/search", base))
                .query(&[("q", query.as_str()), ("source", source)])
        }
        Commands::Anime { id } => client
            .get(format!("{}/anime", base))
            .query(&[("id", id.to_string())]),
        Commands::Schedule => client.get(format!("{}/schedule", base)),
        Commands::Trending => client.get(format!("{}/trending", base)),
        Commands::Popular => client.get(format!("{}/popular", base)),
        Commands::Editorial => client.get(format!("{}/editorial", base)),
        Commands::Download { url, format } => client
            .get(format!("{}/download", base))
            .query(&[("url", url.as_str()), ("format", format.as_str())]),
    };

    print_response(request.send().await?).await
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    let json: Value = res.json().await?;

    if !status.is_success() {
        let message = json
            .get("error")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        eprintln!("Error ({}): {}", status, message);
        std::process::exit(1);
    }

    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(())
}
