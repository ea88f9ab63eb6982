// src/main.rs
mod course;
mod crawl;
mod extractors;
mod rules;
mod storage;
mod utils;

use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;

use crawl::client;
use crawl::runner;
use extractors::{CourseAssembler, CoursePage, ReferenceCache};
use rules::SiteRules;
use storage::{RunSummary, StorageManager};
use utils::AppError;

/// Extracts postgraduate course records from a university website
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Site rule set (JSON), e.g. sites/swansea.json
    #[arg(short, long)]
    rules: PathBuf,

    /// Output directory for extracted records
    #[arg(short, long, default_value = "./output")]
    output_dir: String,

    /// Pause before each request, in milliseconds
    #[arg(long, default_value_t = 250)]
    delay_ms: u64,

    /// Stop after this many course pages
    #[arg(short, long)]
    limit: Option<usize>,

    /// Debug mode - save highlighted copies of every fetched course page
    #[arg(short, long)]
    debug: bool,

    /// Log extraction decisions at debug level
    #[arg(short, long)]
    verbose: bool,

    /// Extra regex to highlight in debug pages (repeatable)
    #[arg(long = "highlight")]
    highlights: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Parse CLI Arguments, then setup logging (RUST_LOG overrides)
    let args = Args::parse();
    utils::logging::setup_logging(args.verbose);

    // 2. Load the site rule set
    tracing::info!("Starting processing for args: {:?}", args);
    let site = SiteRules::from_file(&args.rules)?;
    let delay = Duration::from_millis(args.delay_ms);
    let run_date = chrono::Local::now().date_naive();

    // 3. Initialize storage and the HTTP client
    let storage = StorageManager::new(&args.output_dir)?;
    let http = client::build_client(&site.user_agent)?;

    // 4. Reference pages first: every course page may read these caches
    let cache = ReferenceCache::new();
    runner::populate_reference_cache(&http, &site, &cache, delay).await;

    // 5. Course pages from the listing plus any configured extras
    let harvested = runner::harvest_course_requests(&http, &site, delay).await;
    let requests = runner::select_requests(harvested, &site, args.limit);
    tracing::info!("Found {} course page(s) for {}", requests.len(), site.university_title);

    if requests.is_empty() {
        return Err(AppError::Config(format!("No course pages found for site '{}'", site.site_id)));
    }

    // 6. Fetch and extract each page
    let assembler = CourseAssembler::new(&site, &cache);
    let mut courses = Vec::new();
    let mut summary = RunSummary {
        site_id: site.site_id.clone(),
        university_title: site.university_title.clone(),
        run_date: Some(run_date),
        ..RunSummary::default()
    };

    for (index, request) in requests.into_iter().enumerate() {
        tracing::info!("Processing course page {}: {}", index + 1, request.url);

        let body = match client::download_page(&http, &request.url, delay).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to download course page: {}", e);
                summary.pages_failed += 1;
                continue;
            }
        };
        summary.pages_fetched += 1;

        if args.debug {
            let annotated = storage
                .debug_dir(&site.site_id)
                .map(|dir| dir.join(format!("page_{:04}.html", index + 1)));
            match annotated {
                Ok(path) => {
                    if let Err(e) = utils::html_debug::create_debug_html(&body, &path, &args.highlights) {
                        tracing::warn!("Failed to create debug HTML: {}", e);
                    }
                }
                Err(e) => tracing::warn!("Failed to create debug directory: {}", e),
            }
        }

        let page = CoursePage::parse(&body, request);
        let report = assembler.assemble(&page);
        tracing::info!("Extracted {} record(s) from {}", report.courses.len(), page.url());
        summary.dropped += report.dropped;
        courses.extend(report.courses);
    }
    summary.records = courses.len();

    // 7. Persist the run
    match storage.save_courses(&site.site_id, run_date, &courses) {
        Ok(path) => tracing::info!("Saved course records to: {}", path.display()),
        Err(e) => tracing::error!("Failed to save course records: {}", e),
    }
    match storage.save_run_metadata(&summary) {
        Ok(path) => tracing::info!("Saved run metadata to: {}", path.display()),
        Err(e) => tracing::error!("Failed to save run metadata: {}", e),
    }

    tracing::info!(
        "Processing finished. Pages: {}, Failures: {}, Records: {}, Dropped: {}",
        summary.pages_fetched,
        summary.pages_failed,
        summary.records,
        summary.dropped
    );

    if courses.is_empty() && summary.pages_failed > 0 {
        return Err(AppError::Processing(format!(
            "No records extracted; {} page(s) failed to download",
            summary.pages_failed
        )));
    }

    Ok(())
}
