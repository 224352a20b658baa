use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use praxis_seg::cli::{Command, ResolveArgs, RootArgs, RunArgs};
use praxis_seg::config::PipelinePaths;
use praxis_seg::gate::MissingFilesLog;
use praxis_seg::naming::{RuleSet, SubjectId};
use praxis_seg::pipeline::run_subject;
use praxis_seg::segment::Segmenter;

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = RootArgs::parse();
    let result = match cli.command {
        Command::Run(args) => cmd_run(args),
        Command::Resolve(args) => cmd_resolve(args),
    };

    // The orchestrator decides the process exit code: 0 only after a full
    // successful sequence, 1 for any fatal condition.
    if let Err(err) = result {
        eprintln!("Error: {err:#}");
        std::process::exit(1);
    }
}

fn cmd_run(args: RunArgs) -> Result<()> {
    let paths = PipelinePaths::from_env()?;
    let rules = RuleSet::study_defaults()?;
    let subject = SubjectId::new(args.subject);
    let segmenter = Segmenter::new(args.segment_script, args.model);
    let mut log = MissingFilesLog::new(paths.log_root());

    let summary = run_subject(&paths, &rules, &subject, &segmenter, &mut log)?;
    println!("{}", summary.render());
    Ok(())
}

fn cmd_resolve(args: ResolveArgs) -> Result<()> {
    let paths = PipelinePaths::from_env()?;
    let rules = RuleSet::study_defaults()?;
    let subject = SubjectId::new(args.subject);

    let descriptor = rules.resolve(
        &subject,
        paths.site().as_ref(),
        &paths.labels_anat_dir(&subject),
    );
    println!("{descriptor}");
    Ok(())
}
