use std::{
    fs,
    path::{Path, PathBuf},
    time::Instant,
};

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use serde::Serialize;

use lead_capture::{
    client::{HttpLeadClient, LeadApi},
    dto::lead::LeadResponse,
    storage::{content_type_for, PhotoUpload},
    ui::{
        browser::{display_name, photo_badge},
        CaptureForm, Feedback, LeadBrowser, PhotoState, ViewState,
    },
};

#[derive(Parser)]
#[command(name = "lead-capture", about = "Capture and browse trade-show leads", version)]
struct Cli {
    #[arg(
        long,
        global = true,
        default_value = "http://localhost:5000",
        help = "Base URL of the lead capture server"
    )]
    server: String,
    #[arg(
        long,
        global = true,
        action = ArgAction::SetTrue,
        help = "Render command output as pretty JSON when available"
    )]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Record a new lead
    Submit(SubmitArgs),
    /// List leads, optionally filtered
    Browse(BrowseArgs),
    /// Show one lead and its photos
    Show(ShowArgs),
}

#[derive(Args)]
struct SubmitArgs {
    #[arg(long, help = "Company name")]
    company: Option<String>,
    #[arg(long, help = "Contact person")]
    contact_person: Option<String>,
    #[arg(long, help = "Contact email address")]
    email: Option<String>,
    #[arg(long = "photo", help = "Photo to attach (.png, .jpg, .jpeg); repeatable")]
    photos: Vec<PathBuf>,
}

#[derive(Args)]
struct BrowseArgs {
    #[arg(long, help = "Case-insensitive filter over company, contact and email")]
    query: Option<String>,
}

#[derive(Args)]
struct ShowArgs {
    #[arg(help = "Lead ID")]
    id: i32,
    #[arg(long, help = "Directory to download the lead's photos into")]
    download: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let client = HttpLeadClient::new(cli.server.clone()).context("failed to build HTTP client")?;

    match cli.command {
        Commands::Submit(args) => handle_submit(&client, args, cli.json).await?,
        Commands::Browse(args) => handle_browse(&client, args, cli.json).await?,
        Commands::Show(args) => handle_show(&client, args, cli.json).await?,
    }

    Ok(())
}

async fn handle_submit(client: &HttpLeadClient, args: SubmitArgs, json: bool) -> Result<()> {
    let mut form = CaptureForm::default();
    form.company = args.company.unwrap_or_default();
    form.contact_person = args.contact_person.unwrap_or_default();
    form.email = args.email.unwrap_or_default();

    for path in &args.photos {
        form.add_photo(read_photo(path)?)?;
    }

    form.submit(client).await?;

    match form.feedback(Instant::now()) {
        Feedback::Confirmed { lead_id } => {
            if json {
                print_json(&serde_json::json!({ "id": lead_id }))?;
            } else {
                println!("Lead {} registered", lead_id);
            }
            Ok(())
        }
        Feedback::Failed(message) => Err(anyhow!(message)),
        Feedback::None => Err(anyhow!("submission produced no result")),
    }
}

async fn handle_browse(client: &HttpLeadClient, args: BrowseArgs, json: bool) -> Result<()> {
    let mut browser = LeadBrowser::new();
    browser.activate(client).await;
    if let Some(query) = args.query {
        browser.set_query(query);
    }

    if json {
        return print_json(&browser.filtered());
    }

    match browser.view_state() {
        ViewState::Loading => println!("Loading leads..."),
        ViewState::Empty => println!("No leads found"),
        ViewState::NoMatches => {
            println!("No leads found");
            println!("Try a different search term");
        }
        ViewState::Rows(rows) => {
            for lead in rows {
                render_lead(lead);
            }
            println!("{}", browser.summary());
        }
    }

    Ok(())
}

async fn handle_show(client: &HttpLeadClient, args: ShowArgs, json: bool) -> Result<()> {
    let mut browser = LeadBrowser::new();
    browser.activate(client).await;

    let lead = browser
        .leads()
        .iter()
        .find(|lead| lead.id == args.id)
        .cloned();
    let Some(lead) = lead else {
        // Still surfaces the server's 404 for ids the list does not know
        client.photo_urls(args.id).await?;
        return Err(anyhow!("lead {} not found", args.id));
    };

    browser.open(client, lead.id).await;
    let urls = match browser.photos() {
        Some(PhotoState::Loaded(urls)) => urls.clone(),
        _ => Vec::new(),
    };

    if json {
        #[derive(Serialize)]
        struct LeadDetail<'a> {
            #[serde(flatten)]
            lead: &'a LeadResponse,
            photo_urls: &'a [String],
        }
        print_json(&LeadDetail {
            lead: &lead,
            photo_urls: &urls,
        })?;
    } else {
        render_lead(&lead);
        println!("  contact: {}", lead.contact_person.as_deref().unwrap_or("-"));
        println!("  email:   {}", lead.email.as_deref().unwrap_or("-"));
        for url in &urls {
            println!("  photo:   {}", client.url(url));
        }
    }

    if let Some(dir) = args.download {
        fs::create_dir_all(&dir)
            .with_context(|| format!("failed to create {}", dir.display()))?;
        for url in &urls {
            let name = url.rsplit('/').next().unwrap_or(url.as_str());
            let bytes = client.fetch_photo(url).await?;
            let target = dir.join(name);
            fs::write(&target, bytes)
                .with_context(|| format!("failed to write {}", target.display()))?;
            if !json {
                println!("Saved {}", target.display());
            }
        }
    }

    Ok(())
}

fn read_photo(path: &Path) -> Result<PhotoUpload> {
    let data = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| anyhow!("{} has no usable file name", path.display()))?
        .to_string();
    let content_type = content_type_for(&file_name).to_string();
    Ok(PhotoUpload::new(file_name, Some(content_type), data))
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn render_lead(lead: &LeadResponse) {
    println!(
        "- #{} {} • {} • {}",
        lead.id,
        display_name(lead),
        photo_badge(lead).unwrap_or_else(|| "no photos".to_string()),
        lead.created_at.format("%Y-%m-%d")
    );
}
