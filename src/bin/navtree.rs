//! navtree CLI tool
//!
//! Builds the global navigation for a TOML dataset and prints it.
//!
//! ## Commands
//!
//! - `build <dataset>`: Build the tree for one viewer and location
//! - `expand <dataset> <request>`: Run a narrow expansion pass, e.g. `'{"category":3}'`
//!
//! Access follows the dataset's enrolments unless `--allow-all` is given. Settings are read from
//! the `[navigation]` table of `--config`, with defaults for anything missing.

use clap::{Args, Parser, Subcommand};
use navtree_core::{
    access::StaticAccessPolicy,
    builder::{ExpandRequest, Services, TreeBuilder},
    cache::ExpansionCache,
    config::{ConfigProvider, NavigationConfig, TomlConfigProvider},
    context::{Location, NavigationContext, Viewer},
    flat::FlatNavigation,
    locator::Locator,
    repository::{Dataset, MemoryRepository},
    tree::NavigationTree,
};
use std::{path::PathBuf, sync::Arc};

#[derive(Parser)]
#[command(name = "navtree")]
#[command(author, version, about = "Build and inspect LMS navigation trees", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the navigation for a viewer and location
    Build {
        #[command(flatten)]
        site: SiteArgs,

        /// Category page being viewed
        #[arg(long, conflicts_with_all = ["course", "activity"])]
        category: Option<i64>,

        /// Course page being viewed
        #[arg(long)]
        course: Option<i64>,

        /// Activity page being viewed (requires --course)
        #[arg(long, requires = "course")]
        activity: Option<i64>,

        /// Profile page of this user
        #[arg(long)]
        profile: Option<i64>,

        /// Locator of the current page, used to find the active node
        #[arg(long)]
        url: Option<String>,

        /// Page type, e.g. `grade-report-grader-index`
        #[arg(long)]
        page_type: Option<String>,

        /// Also print the flat navigation
        #[arg(long)]
        flat: bool,

        /// Also list the branches left for the asynchronous loader
        #[arg(long)]
        expandable: bool,

        /// Print the tree as a JSON snapshot instead of an outline
        #[arg(long)]
        json: bool,
    },

    /// Materialize a single branch
    Expand {
        #[command(flatten)]
        site: SiteArgs,

        /// The branch, as JSON: `"courses"`, `{"category":3}`, `{"course":5}` or
        /// `{"section":{"course":5,"section":51}}`
        request: String,
    },
}

#[derive(Args)]
struct SiteArgs {
    /// TOML dataset to load into the in-memory repository
    dataset: PathBuf,

    /// Configuration file with a [navigation] table
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Signed-in user id (anonymous when omitted)
    #[arg(short, long)]
    user: Option<i64>,

    /// Browse as a guest instead of anonymously
    #[arg(long, conflicts_with = "user")]
    guest: bool,

    /// Grant every permission instead of following enrolments
    #[arg(long)]
    allow_all: bool,
}

impl SiteArgs {
    fn viewer(&self) -> Viewer {
        match (self.user, self.guest) {
            (Some(user), _) => Viewer::User(user),
            (None, true) => Viewer::Guest,
            (None, false) => Viewer::Anonymous,
        }
    }

    fn load(&self) -> Result<(Services, NavigationConfig), Box<dyn std::error::Error>> {
        let source = std::fs::read_to_string(&self.dataset)?;
        let dataset: Dataset = toml::from_str(&source)?;
        let access = if self.allow_all {
            StaticAccessPolicy::allow_all()
        } else {
            StaticAccessPolicy::from_enrolments(&dataset.enrolments)
        };
        let services = Services::new(
            Arc::new(MemoryRepository::new(dataset)),
            Arc::new(access),
        );
        let config = match &self.config {
            Some(path) => TomlConfigProvider::new(path.clone()).get_config()?,
            None => NavigationConfig::default(),
        };
        Ok((services, config))
    }
}

fn print_tree(tree: &NavigationTree, json: bool) -> Result<(), Box<dyn std::error::Error>> {
    if json {
        println!("{}", serde_json::to_string_pretty(&tree.snapshot(tree.root()))?);
    } else {
        print!("{}", tree.outline()?);
    }
    for diagnostic in tree.diagnostics() {
        eprintln!("Warning: {diagnostic}");
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Build {
            site,
            category,
            course,
            activity,
            profile,
            url,
            page_type,
            flat,
            expandable,
            json,
        } => {
            let (services, config) = site.load()?;
            let location = match (category, course, activity, profile) {
                (_, _, _, Some(user)) => Location::user(user, course),
                (_, Some(course), Some(activity), None) => Location::activity(course, activity),
                (_, Some(course), None, None) => Location::course(course),
                (Some(category), _, _, None) => Location::category(category),
                _ => Location::system(),
            };
            let mut context = NavigationContext::new(site.viewer(), location);
            if let Some(url) = url {
                context = context.with_active_url(Locator::parse(&url)?);
            }
            if let Some(page_type) = page_type {
                context = context.with_page_type(page_type);
            }

            let mut tree = TreeBuilder::new(
                services.clone(),
                config.clone(),
                context,
                ExpansionCache::default(),
            )
            .build()?;

            let violations = tree.built_in_test();
            if !violations.is_empty() {
                for violation in &violations {
                    eprintln!("Error: {violation}");
                }
                std::process::exit(1);
            }
            print_tree(&tree, json)?;

            if flat {
                let flat = FlatNavigation::build(&tree, &services, &config, course)?;
                println!();
                if let Some(label) = flat.label() {
                    println!("Flat navigation ({label}):");
                }
                for node in flat.nodes() {
                    if node.show_divider {
                        println!("----");
                    }
                    let marker = if node.active { "*" } else { "-" };
                    println!(
                        "{:indent$}{marker} {} [{}]",
                        "",
                        node.text,
                        node.key,
                        indent = usize::from(node.indent) * 2
                    );
                }
            }

            if expandable {
                println!();
                for branch in tree.find_expandable() {
                    let request = ExpandRequest::from_branch(&tree, &branch)
                        .map(|r| serde_json::to_string(&r))
                        .transpose()?
                        .unwrap_or_else(|| "-".to_string());
                    println!("{} {} {}", branch.id, branch.node_type, request);
                }
            }
        }
        Commands::Expand { site, request } => {
            let (services, config) = site.load()?;
            let request: ExpandRequest = serde_json::from_str(&request)?;
            let context = NavigationContext::new(site.viewer(), Location::system());
            let tree = TreeBuilder::new(services, config, context, ExpansionCache::default())
                .expand(request)?;
            print_tree(&tree, false)?;
        }
    }

    Ok(())
}
