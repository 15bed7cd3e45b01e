use clap::{Arg, ArgMatches, Command};
use std::sync::Arc;
use tmgmt_connector::{
    Availability, BatchSubmitter, DispatchMode, InMemoryJobStore, InMemoryQueue, JobStore,
    QueueWorker, TranslationJob, TranslatorSettings, adapter_for, language,
};

fn translator_arg() -> Arg {
    Arg::new("translator")
        .long("translator")
        .short('t')
        .help("Translator plugin: lang_connector or xtm_connect")
        .value_parser(["lang_connector", "xtm_connect"])
        .default_value("lang_connector")
}

fn settings_arg() -> Arg {
    Arg::new("settings")
        .long("settings")
        .help("JSON settings file (default: TMGMT_CONNECTOR_* environment variables)")
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let matches = Command::new("tmgmt-connector")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Submit translation jobs to LangConnector or XTMConnect")
        .subcommand_required(true)
        .subcommand(
            Command::new("submit")
                .about("Request translation of the jobs in a JSON file")
                .arg(
                    Arg::new("jobs")
                        .help("JSON file with one job or an array of sibling jobs")
                        .required(true)
                        .index(1),
                )
                .arg(translator_arg())
                .arg(
                    Arg::new("mode")
                        .long("mode")
                        .short('m')
                        .help("Dispatch mode")
                        .value_parser(["immediate", "deferred"])
                        .default_value("immediate"),
                )
                .arg(settings_arg())
                .arg(
                    Arg::new("process-queue")
                        .long("process-queue")
                        .help("Drain the work queue after a deferred submission")
                        .action(clap::ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("validate")
                .about("Check the translator settings against the remote service")
                .arg(translator_arg())
                .arg(settings_arg()),
        )
        .subcommand(
            Command::new("languages")
                .about("List the languages supported by the remote service")
                .arg(
                    Arg::new("source")
                        .long("source")
                        .short('s')
                        .help("Only list targets available for this remote source code"),
                ),
        )
        .get_matches();

    match matches.subcommand() {
        Some(("submit", args)) => submit(args).await,
        Some(("validate", args)) => validate(args).await,
        Some(("languages", args)) => {
            languages(args);
            Ok(())
        }
        _ => unreachable!("a subcommand is required"),
    }
}

fn load_settings(args: &ArgMatches) -> Result<TranslatorSettings, Box<dyn std::error::Error>> {
    let settings = match args.get_one::<String>("settings") {
        Some(path) => TranslatorSettings::from_json_file(path)?,
        None => TranslatorSettings::from_env()?,
    };
    Ok(settings)
}

fn load_jobs(path: &str) -> Result<Vec<TranslationJob>, Box<dyn std::error::Error>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| format!("Failed to read job file {}: {}", path, e))?;
    let value: serde_json::Value = serde_json::from_str(&content)?;
    let jobs = match value {
        serde_json::Value::Array(_) => serde_json::from_value(value)?,
        _ => vec![serde_json::from_value(value)?],
    };
    Ok(jobs)
}

async fn submit(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let path = args.get_one::<String>("jobs").unwrap();
    let translator = args.get_one::<String>("translator").unwrap();
    let mode = match args.get_one::<String>("mode").map(String::as_str) {
        Some("deferred") => DispatchMode::Deferred,
        _ => DispatchMode::Immediate,
    };

    let jobs = load_jobs(path)?;
    let store = Arc::new(InMemoryJobStore::with_jobs(jobs.clone()));
    let queue = Arc::new(InMemoryQueue::new());
    let submitter = Arc::new(BatchSubmitter::new(
        adapter_for(translator)?,
        load_settings(args)?,
        store.clone(),
        queue.clone(),
    )?);

    let mut failures = 0;
    for job in &jobs {
        // Siblings may have been updated by an earlier submission
        let mut job = store.load(job.id).await?.unwrap_or_else(|| job.clone());
        match submitter.request_translation(&mut job, mode).await {
            Ok(outcome) => eprintln!(
                "✅ Job {}: submitted={}, items={}, queued={}, batch_sent={}",
                outcome.job_id,
                outcome.submitted,
                outcome.items.len(),
                outcome.queued,
                outcome.batch_sent
            ),
            Err(e) => {
                eprintln!("❌ Job {}: {}", job.id, e);
                failures += 1;
            }
        }
    }

    if mode == DispatchMode::Deferred && args.get_flag("process-queue") {
        let report = QueueWorker::new(submitter.clone()).drain().await?;
        eprintln!(
            "📦 Processed {} queued units, {} failed",
            report.processed,
            report.failed.len()
        );
        failures += report.failed.len();
    }

    println!("{}", serde_json::to_string_pretty(&store.all().await)?);

    if failures > 0 {
        return Err(format!("{} translation request(s) failed", failures).into());
    }
    Ok(())
}

async fn validate(args: &ArgMatches) -> Result<(), Box<dyn std::error::Error>> {
    let translator = args.get_one::<String>("translator").unwrap();
    let submitter = BatchSubmitter::new(
        adapter_for(translator)?,
        load_settings(args)?,
        Arc::new(InMemoryJobStore::new()),
        Arc::new(InMemoryQueue::new()),
    )?;

    let availability = submitter.validate().await;
    if availability.is_available() {
        println!("✅ {} is available", submitter.adapter().name());
    } else {
        println!("❌ {}", availability_message(&availability));
    }
    availability.into_result()?;
    Ok(())
}

fn availability_message(availability: &Availability) -> &str {
    match availability {
        Availability::Available => "available",
        Availability::Unavailable(reason) => reason,
    }
}

fn languages(args: &ArgMatches) {
    let languages = match args.get_one::<String>("source") {
        Some(source) => language::supported_target_languages(source),
        None => language::supported_remote_languages().to_vec(),
    };
    for (code, label) in languages {
        println!("{}\t{}", code, label);
    }
}
