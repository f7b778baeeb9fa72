use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::Value;

use stepwise_blog::config::{load_or_default, BlogConfig};
use stepwise_blog::routing::RouteTableBuilder;
use stepwise_blog::services::{markdown, settings, PasswordHasher};
use stepwise_blog::steps;
use stepwise_blog::store::{NewUser, PostDraft, Role, Store};

#[derive(Parser)]
#[command(name = "blog-cli")]
#[command(about = "Operator CLI for the stepwise blog", long_about = None)]
struct Cli {
    /// Configuration file, used for the feature root and hashing settings.
    #[arg(short, long, default_value = "blog.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan the feature tree, build the route table and print it
    Routes {
        /// Feature tree root; defaults to `features.root` from the config
        #[arg(long)]
        root: Option<PathBuf>,
    },
    /// Write a demo datastore snapshot with an admin account and sample posts
    Seed {
        /// Snapshot to write
        #[arg(long, default_value = "data/blog.json")]
        data_file: PathBuf,
        #[arg(long, default_value = "admin")]
        username: String,
        #[arg(long, default_value = "password123")]
        password: String,
        /// Overwrite an existing snapshot
        #[arg(long)]
        force: bool,
    },
    /// Query a running server's search API
    Search {
        query: String,
        #[arg(short, long, default_value = "http://localhost:5555")]
        url: String,
        #[arg(long, default_value_t = 1)]
        page: usize,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let required = cli.config.as_os_str() != "blog.toml";
    let config = load_or_default(&cli.config, required)?;

    match cli.command {
        Commands::Routes { root } => {
            let root = root.unwrap_or_else(|| config.features.root.clone());
            print_routes(&root)
        }
        Commands::Seed {
            data_file,
            username,
            password,
            force,
        } => {
            if data_file.exists() && !force {
                anyhow::bail!("{} already exists (use --force to overwrite)", data_file.display());
            }
            if data_file.exists() {
                std::fs::remove_file(&data_file)?;
            }
            seed(&config, &data_file, &username, &password).await?;
            println!("Seeded {} (admin: {username})", data_file.display());
            Ok(())
        }
        Commands::Search { query, url, page } => search(&url, &query, page).await,
    }
}

fn print_routes(root: &Path) -> anyhow::Result<()> {
    let registry = steps::registry();
    let table = RouteTableBuilder::new(&registry).build_from_dir(root)?;

    for route in table.routes() {
        println!("{:<7} {}", route.method().as_str(), route.template());
        if let Some(init) = route.initializer() {
            println!("        init  {}", init.handler_key());
        }
        for step in route.steps() {
            match step.description() {
                Some(description) => {
                    println!("        {:<5} {}  ({description})", step.name(), step.handler_key())
                }
                None => println!("        {:<5} {}", step.name(), step.handler_key()),
            }
        }
    }
    println!("{} routes", table.len());
    Ok(())
}

async fn seed(config: &BlogConfig, data_file: &Path, username: &str, password: &str) -> anyhow::Result<()> {
    let store = Store::open(data_file)?;
    let hasher = PasswordHasher::new(config.auth.pbkdf2_iterations);

    let admin = store
        .create_user(NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            password_hash: hasher.hash(password).await?,
            display_name: "Administrator".to_string(),
            role: Role::Admin,
        })
        .await?;

    store.set_setting(settings::BLOG_NAME, &config.site.name).await?;
    store
        .set_setting(settings::BLOG_DESCRIPTION, &config.site.description)
        .await?;

    let notes = store
        .create_category("Notes", "notes", Some("Short write-ups".to_string()), None)
        .await?;
    store.create_category("Projects", "projects", None, None).await?;
    let rust = store.create_tag("Rust", "rust").await?;
    let web = store.create_tag("Web", "web").await?;

    let posts = [
        (
            "Hello, world",
            "hello-world",
            "Welcome to the blog.\n\nPosts are written in **markdown**.",
            vec![web.id.clone()],
        ),
        (
            "Routes as folders",
            "routes-as-folders",
            "Every route is a directory.\nEvery step is a file.\n\n```\nblog/[slug]/@get/steps/100-fetch-post.toml\n```",
            vec![rust.id.clone(), web.id.clone()],
        ),
    ];
    for (title, slug, content, tag_ids) in posts {
        store
            .create_post(
                &admin.id,
                PostDraft {
                    title: title.to_string(),
                    slug: slug.to_string(),
                    content: content.to_string(),
                    content_html: markdown::render(content),
                    excerpt: Some(markdown::plain_excerpt(content, 200)),
                    published: true,
                    category_id: Some(notes.id.clone()),
                    tag_ids,
                    ..Default::default()
                },
            )
            .await?;
    }

    store.add_highlight("📝", "Writing about systems", 1).await?;
    store.add_highlight("🔧", "Building small tools", 2).await?;
    store
        .add_tech_stack("Rust", "Server, routing and the step pipeline", 1)
        .await?;
    store.add_tech_stack("Markdown", "Post authoring", 2).await?;

    store.set_setting(settings::INSTALLED, "true").await?;
    Ok(())
}

async fn search(url: &str, query: &str, page: usize) -> anyhow::Result<()> {
    let client = reqwest::Client::new();
    let page = page.to_string();
    let res = client
        .get(format!("{}/api/search", url.trim_end_matches('/')))
        .query(&[("q", query), ("page", page.as_str())])
        .send()
        .await?;

    let status = res.status();
    let body: Value = res.json().await?;
    if !status.is_success() {
        anyhow::bail!("search API returned {status}: {body}");
    }

    let posts = body["posts"].as_array().cloned().unwrap_or_default();
    for post in &posts {
        println!(
            "{}  /blog/{}",
            post["title"].as_str().unwrap_or("(untitled)"),
            post["slug"].as_str().unwrap_or("")
        );
    }
    println!(
        "{} of {} results (page {}/{})",
        posts.len(),
        body["total"],
        body["page"],
        body["totalPages"]
    );
    Ok(())
}
