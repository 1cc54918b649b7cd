use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use indicatif::{ProgressBar, ProgressStyle};
use morpheme_scorer::compact::{compact_path, write_compact_csv};
use morpheme_scorer::report::{write_jsonl, write_results_csv};
use morpheme_scorer::{
    Annotator, AnnotatorFailurePolicy, ConlluAnnotator, HttpAnnotator, Scorer, SeenContexts,
    annotator_inputs,
};
use transcript_utils::text_cleanup::extract_scored_lines;

/// Score child language transcripts for article, auxiliary and progressive
/// morpheme productivity
#[derive(Parser, Debug)]
#[command(version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the cleaned utterances of a transcript, one per line, as the
    /// annotator will see them
    Extract { file: PathBuf },

    /// Score a transcript (.cha or .txt) or a directory of them
    Score {
        path: PathBuf,

        /// Directory for the results reports
        #[arg(short, long, default_value = "output")]
        output: PathBuf,

        /// Pre-computed CoNLL-U annotations of the cleaned utterances
        #[arg(long)]
        conllu: Option<PathBuf>,

        /// URL of a parser service to annotate utterances with
        #[arg(long, env = "MORPHEME_ANNOTATOR_URL")]
        annotator_url: Option<String>,

        /// Also write the verdicts as JSON lines
        #[arg(long)]
        json: bool,

        /// Move each transcript here once it has been scored
        #[arg(long)]
        move_processed: Option<PathBuf>,

        /// What to do when the annotator fails on an utterance
        #[arg(long, value_enum, default_value_t = OnAnnotatorError::Degrade)]
        on_annotator_error: OnAnnotatorError,
    },

    /// Sum the productivity totals of a results report or a directory of them
    Compact {
        path: PathBuf,

        /// Directory for the compact report
        #[arg(short, long, default_value = ".")]
        output: PathBuf,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug)]
enum OnAnnotatorError {
    Abort,
    Degrade,
}

impl From<OnAnnotatorError> for AnnotatorFailurePolicy {
    fn from(value: OnAnnotatorError) -> Self {
        match value {
            OnAnnotatorError::Abort => AnnotatorFailurePolicy::Abort,
            OnAnnotatorError::Degrade => AnnotatorFailurePolicy::Degrade,
        }
    }
}

fn main() -> Result<()> {
    // Load .env file if it exists
    dotenvy::dotenv().ok();
    env_logger::init();

    let args = Args::parse();

    match args.command {
        Command::Extract { file } => {
            let transcript = std::fs::read_to_string(&file)
                .with_context(|| format!("Failed to read {}", file.display()))?;
            for line in annotator_inputs(&transcript) {
                println!("{line}");
            }
        }
        Command::Score {
            path,
            output,
            conllu,
            annotator_url,
            json,
            move_processed,
            on_annotator_error,
        } => {
            let annotator: Box<dyn Annotator> = match (conllu, annotator_url) {
                (Some(conllu), _) => Box::new(ConlluAnnotator::from_file(&conllu)?),
                (None, Some(url)) => Box::new(HttpAnnotator::new(url)?),
                (None, None) => bail!(
                    "No annotator configured: pass --conllu or --annotator-url (or set MORPHEME_ANNOTATOR_URL)"
                ),
            };
            let scorer = Scorer::new(annotator).with_failure_policy(on_annotator_error.into());

            let transcripts = transcript_files(&path)?;
            if transcripts.is_empty() {
                println!("No .cha or .txt files found in {}", path.display());
                return Ok(());
            }

            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;

            for transcript in transcripts {
                score_file(&scorer, &transcript, &output, json)?;

                if let Some(done_dir) = &move_processed {
                    std::fs::create_dir_all(done_dir)
                        .with_context(|| format!("Failed to create {}", done_dir.display()))?;
                    let file_name = transcript
                        .file_name()
                        .context("Transcript path has no file name")?;
                    let destination = done_dir.join(file_name);
                    std::fs::rename(&transcript, &destination).with_context(|| {
                        format!(
                            "Failed to move {} to {}",
                            transcript.display(),
                            destination.display()
                        )
                    })?;
                    println!("Moved processed file to: {}", destination.display());
                }
            }
        }
        Command::Compact { path, output } => {
            let (name, rows) = compact_path(&path)?;
            std::fs::create_dir_all(&output)
                .with_context(|| format!("Failed to create {}", output.display()))?;
            let output_path = output.join(format!("{name}_compact.csv"));
            let file = File::create(&output_path)
                .with_context(|| format!("Failed to create {}", output_path.display()))?;
            write_compact_csv(BufWriter::new(file), &rows)?;
            println!("Compact file written: {}", output_path.display());
        }
    }

    Ok(())
}

/// The transcript itself, or the .cha and .txt files of a directory in name order
fn transcript_files(path: &Path) -> Result<Vec<PathBuf>> {
    if path.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    if !path.is_dir() {
        bail!("{} is not a valid file or directory", path.display());
    }

    let mut files = Vec::new();
    for entry in std::fs::read_dir(path)
        .with_context(|| format!("Failed to list directory {}", path.display()))?
    {
        let file = entry?.path();
        let is_transcript = file
            .extension()
            .is_some_and(|ext| ext == "cha" || ext == "txt");
        if file.is_file() && is_transcript {
            files.push(file);
        }
    }
    files.sort();
    Ok(files)
}

fn score_file<A: Annotator>(
    scorer: &Scorer<A>,
    transcript: &Path,
    output: &Path,
    json: bool,
) -> Result<()> {
    let text = std::fs::read_to_string(transcript)
        .with_context(|| format!("Failed to read {}", transcript.display()))?;
    let stem = transcript
        .file_stem()
        .context("Transcript path has no file name")?
        .to_string_lossy()
        .into_owned();

    let utterances = extract_scored_lines(&text);
    log::info!(
        "Scoring {} utterances from {}",
        utterances.len(),
        transcript.display()
    );

    let pb = ProgressBar::new(utterances.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} utterances ({per_sec}, {eta})")?
            .progress_chars("#>-"),
    );

    let mut seen = SeenContexts::new();
    let verdicts = scorer
        .score_corpus(pb.wrap_iter(utterances.iter()), &mut seen)
        .with_context(|| format!("Failed to score {}", transcript.display()))?;
    pb.finish_and_clear();

    let [articles, auxiliaries, progressives, active_progressives] = seen.sizes();
    log::info!(
        "{stem}: {articles} article contexts, {auxiliaries} auxiliary contexts, {progressives} progressive verbs, {active_progressives} active progressive verbs"
    );
    let article_contexts: Vec<String> = seen
        .articles()
        .map(|(determiner, noun)| format!("({determiner}, {noun})"))
        .collect();
    log::debug!("{stem}: article contexts {}", article_contexts.join(" "));

    let csv_path = output.join(format!("{stem}_results.csv"));
    let file = File::create(&csv_path)
        .with_context(|| format!("Failed to create {}", csv_path.display()))?;
    write_results_csv(BufWriter::new(file), &verdicts)
        .with_context(|| format!("Failed to write {}", csv_path.display()))?;
    println!("CSV written: {}", csv_path.display());

    if json {
        let jsonl_path = output.join(format!("{stem}_results.jsonl"));
        let file = File::create(&jsonl_path)
            .with_context(|| format!("Failed to create {}", jsonl_path.display()))?;
        write_jsonl(BufWriter::new(file), &verdicts)
            .with_context(|| format!("Failed to write {}", jsonl_path.display()))?;
        println!("JSON lines written: {}", jsonl_path.display());
    }

    Ok(())
}
