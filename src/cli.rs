// Command-line surface: argument definitions and one handler per command
// group. Handlers resolve references, submit work and print; the logic
// they rely on lives in `resolve`, `dispatch` and `poll`.

use anyhow::{Context, Result};
use clap::{ArgGroup, Args as ClapArgs, Parser, Subcommand};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::api::{ApiClient, NoteOptions, SourceOptions};
use crate::config::{Config, DEFAULT_BASE_URL, DEFAULT_PREFERRED_PROVIDER, DEFAULT_TIMEOUT_SECS};
use crate::dispatch::{self, Dispatch, JobHandle};
use crate::error::{Error, ResourceKind};
use crate::models::{NewPodcast, NewTransformation, NoteType, SearchType, SourceInput};
use crate::poll::{poll, Deadline, PollOptions};
use crate::resolve::{resolve, resolve_or_create_notebook, resolve_transformations};
use crate::transport::{Request, Transport};
use crate::ui;

const EXIT_GENERIC_FAILURE: i32 = 1;

#[derive(Parser, Debug)]
#[command(name = "open-notebook")]
#[command(about = "Open Notebook command-line client", long_about = None)]
pub struct Args {
    /// Base URL of the Open Notebook backend
    #[arg(long, env = "OPEN_NOTEBOOK_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    /// Backend password (sent as Authorization: Bearer ...)
    #[arg(long, env = "OPEN_NOTEBOOK_PASSWORD", hide_env_values = true)]
    pub password: Option<String>,

    /// HTTP timeout seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub timeout_secs: u64,

    /// Provider preferred when no --model is given
    #[arg(long, env = "OPEN_NOTEBOOK_PREFERRED_PROVIDER", default_value = DEFAULT_PREFERRED_PROVIDER)]
    pub preferred_provider: String,

    /// Log level
    #[arg(long, default_value = "warn")]
    pub log_level: String,

    #[command(subcommand)]
    pub cmd: Cmd,
}

#[derive(Subcommand, Debug)]
pub enum Cmd {
    /// List, create and inspect notebooks
    Notebooks {
        #[command(subcommand)]
        cmd: NotebookCmd,
    },

    /// List, inspect and add sources
    Sources {
        #[command(subcommand)]
        cmd: SourceCmd,
    },

    /// List and create notes
    Notes {
        #[command(subcommand)]
        cmd: NoteCmd,
    },

    /// Search the knowledge base
    Search {
        query: String,
        #[arg(long = "type", short = 't', value_enum, default_value_t = SearchType::Text)]
        search_type: SearchType,
        #[arg(long, short = 'l', default_value_t = 20)]
        limit: u32,
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },

    /// Ask the knowledge base a question
    Ask {
        #[arg(long, short = 'q')]
        question: String,
        #[arg(long, short = 'm')]
        model: Option<String>,
        #[command(flatten)]
        wait: WaitArgs,
    },

    /// Manage and run transformations
    Transformations {
        #[command(subcommand)]
        cmd: TransformationCmd,
    },

    /// AI models known to the backend
    Models {
        #[command(subcommand)]
        cmd: ModelCmd,
    },

    /// Check a background job
    Status {
        command_id: String,
        /// Keep checking until the job finishes
        #[arg(long, short = 'w', default_value_t = false)]
        watch: bool,
        /// Seconds between checks
        #[arg(long, short = 'i', default_value_t = 5)]
        interval: u64,
        /// Give up watching after this many seconds (default: never)
        #[arg(long)]
        deadline_secs: Option<u64>,
    },

    /// List and create podcasts
    Podcasts {
        #[command(subcommand)]
        cmd: PodcastCmd,
    },
}

#[derive(Subcommand, Debug)]
pub enum NotebookCmd {
    List {
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
        #[arg(long, short = 'v', default_value_t = false)]
        verbose: bool,
    },
    Create {
        name: String,
        #[arg(long, default_value = "")]
        description: String,
    },
    Get {
        /// Notebook ID or name
        notebook: String,
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum SourceCmd {
    List {
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
    Get {
        source_id: String,
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
    Add(AddSourceArgs),
}

#[derive(ClapArgs, Debug)]
#[command(group(ArgGroup::new("input").required(true).args(["file", "url", "text"])))]
pub struct AddSourceArgs {
    /// Path to a file to upload
    #[arg(long, short = 'f')]
    pub file: Option<PathBuf>,
    /// URL to add as a source
    #[arg(long, short = 'u')]
    pub url: Option<String>,
    /// Text content to add
    #[arg(long, short = 't')]
    pub text: Option<String>,
    /// Notebook name or ID; created when no notebook matches
    #[arg(long, short = 'n')]
    pub notebook: Option<String>,
    #[arg(long)]
    pub title: Option<String>,
    /// Comma-separated transformation IDs or names to apply
    #[arg(long, value_delimiter = ',')]
    pub transformations: Vec<String>,
    #[command(flatten)]
    pub wait: WaitArgs,
}

#[derive(Subcommand, Debug)]
pub enum NoteCmd {
    List {
        /// Only notes of this notebook (ID or name)
        #[arg(long, short = 'n')]
        notebook: Option<String>,
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
    Create {
        content: String,
        #[arg(long)]
        title: Option<String>,
        #[arg(long, short = 'n')]
        notebook: Option<String>,
        #[arg(long, value_enum, default_value_t = NoteType::Human)]
        note_type: NoteType,
    },
}

#[derive(Subcommand, Debug)]
pub enum TransformationCmd {
    List {
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        title: String,
        /// Prompt template
        #[arg(long)]
        prompt: String,
        #[arg(long, default_value = "")]
        description: String,
        #[arg(long, default_value_t = false)]
        apply_default: bool,
    },
    Execute {
        /// Transformation ID or name
        transformation: String,
        /// Input text, or a path to a file holding it
        #[arg(long, short = 'i')]
        input: String,
        #[arg(long, short = 'm')]
        model: Option<String>,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

#[derive(Subcommand, Debug)]
pub enum ModelCmd {
    List {
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
}

#[derive(Subcommand, Debug)]
pub enum PodcastCmd {
    List {
        #[arg(long, short = 'j', default_value_t = false)]
        json: bool,
    },
    Create {
        #[arg(long)]
        name: String,
        #[arg(long)]
        content: String,
        #[arg(long, default_value = "default")]
        episode_profile: String,
        #[arg(long, default_value = "default")]
        speaker_profile: String,
        #[command(flatten)]
        wait: WaitArgs,
    },
}

/// Follow-up behaviour when the backend queues the work as a job.
#[derive(ClapArgs, Debug, Clone)]
pub struct WaitArgs {
    /// Wait for a queued job to finish
    #[arg(long, short = 'w', default_value_t = false)]
    pub wait: bool,
    /// Seconds between status checks while waiting
    #[arg(long, default_value_t = 5)]
    pub interval: u64,
}

impl WaitArgs {
    fn options(&self) -> PollOptions {
        PollOptions {
            wait: true,
            interval: Duration::from_secs(self.interval),
            deadline: Deadline::Unbounded,
        }
    }
}

/// Exit code for a failure surfaced at the process boundary.
pub fn exit_code(err: &anyhow::Error) -> i32 {
    err.chain()
        .find_map(|e| e.downcast_ref::<Error>())
        .map(Error::exit_code)
        .unwrap_or(EXIT_GENERIC_FAILURE)
}

pub fn run(args: Args) -> Result<()> {
    let config = Config::new(&args.base_url, args.password)
        .with_timeout(Duration::from_secs(args.timeout_secs))
        .with_preferred_provider(&args.preferred_provider);
    let api = ApiClient::from_config(&config)?;
    let preferred = config.preferred_provider.as_str();

    match args.cmd {
        Cmd::Notebooks { cmd } => run_notebooks(&api, cmd),
        Cmd::Sources { cmd } => run_sources(&api, cmd),
        Cmd::Notes { cmd } => run_notes(&api, cmd),
        Cmd::Search {
            query,
            search_type,
            limit,
            json,
        } => run_search(&api, &query, search_type, limit, json),
        Cmd::Ask {
            question,
            model,
            wait,
        } => run_ask(&api, &question, model.as_deref(), preferred, &wait),
        Cmd::Transformations { cmd } => run_transformations(&api, cmd, preferred),
        Cmd::Models { cmd } => match cmd {
            ModelCmd::List { json } => {
                if json {
                    return print_json(&api.raw(Request::get("/models"))?);
                }
                print!("{}", ui::models(&api.list_models()?));
                Ok(())
            }
        },
        Cmd::Status {
            command_id,
            watch,
            interval,
            deadline_secs,
        } => {
            let opts = PollOptions {
                wait: watch,
                interval: Duration::from_secs(interval),
                deadline: deadline_secs
                    .map(|s| Deadline::After(Duration::from_secs(s)))
                    .unwrap_or_default(),
            };
            follow(&api, &JobHandle::new(command_id), opts)
        }
        Cmd::Podcasts { cmd } => run_podcasts(&api, cmd),
    }
}

fn run_notebooks<T: Transport>(api: &ApiClient<T>, cmd: NotebookCmd) -> Result<()> {
    match cmd {
        NotebookCmd::List { json, verbose } => {
            if json {
                return print_json(&api.raw(Request::get("/notebooks"))?);
            }
            print!("{}", ui::notebooks(&api.list_notebooks()?, verbose));
            Ok(())
        }
        NotebookCmd::Create { name, description } => {
            let nb = api.create_notebook(&name, &description)?;
            println!("Created notebook: {}", nb.name);
            println!("ID: {}", nb.id);
            Ok(())
        }
        NotebookCmd::Get { notebook, json } => {
            let id = resolve(api, ResourceKind::Notebook, &notebook)?;
            if json {
                return print_json(&api.raw(Request::get(format!("/notebooks/{}", id)))?);
            }
            print!("{}", ui::notebook(&api.get_notebook(&id)?));
            Ok(())
        }
    }
}

fn run_sources<T: Transport>(api: &ApiClient<T>, cmd: SourceCmd) -> Result<()> {
    match cmd {
        SourceCmd::List { json } => {
            if json {
                return print_json(&api.raw(Request::get("/sources"))?);
            }
            print!("{}", ui::sources(&api.list_sources()?));
            Ok(())
        }
        SourceCmd::Get { source_id, json } => {
            if json {
                return print_json(&api.raw(Request::get(format!("/sources/{}", source_id)))?);
            }
            let src = api.get_source(&source_id)?;
            print!("{}", ui::sources(std::slice::from_ref(&src)));
            Ok(())
        }
        SourceCmd::Add(args) => run_add_source(api, args),
    }
}

fn run_add_source<T: Transport>(api: &ApiClient<T>, args: AddSourceArgs) -> Result<()> {
    let input = match (args.file, args.url, args.text) {
        (Some(path), _, _) => SourceInput::File(path),
        (None, Some(url), _) => SourceInput::Url(url),
        (None, None, Some(text)) => SourceInput::Text(text),
        (None, None, None) => {
            return Err(Error::UserInput("must provide --file, --url, or --text".into()).into())
        }
    };

    // Everything that can miss is resolved before the notebook is created.
    let transformations = resolve_transformations(api, &list_entries(&args.transformations))?;
    let notebook_id = match args.notebook.as_deref() {
        Some(token) => {
            let resolved = resolve_or_create_notebook(api, token)?;
            if resolved.created {
                println!("Notebook '{}' not found. Created notebook: {}", token, resolved.id);
            }
            Some(resolved.id)
        }
        None => None,
    };
    let opts = SourceOptions {
        notebook_id: notebook_id.as_deref(),
        title: args.title.as_deref(),
        transformations: &transformations,
    };

    match &input {
        SourceInput::File(path) => println!("Uploading file: {}", path.display()),
        SourceInput::Url(url) => println!("Adding URL: {}", url),
        SourceInput::Text(_) => println!("Adding text content..."),
    }
    let spinner = ui::spinner("Submitting source...");
    let outcome = dispatch::create_source(api, &input, &opts);
    spinner.finish_and_clear();

    match outcome? {
        Dispatch::Immediate(src) => {
            println!("{} source created!", input.kind().as_str());
            println!("Source ID: {}", src.id);
            if let Some(processing) = src.source_id {
                println!("Processing: {}", processing);
            }
            Ok(())
        }
        Dispatch::Tracked { handle, receipt } => {
            if let Some(id) = receipt.get("id").and_then(Value::as_str) {
                println!("Source ID: {}", id);
            }
            report_tracked(api, &handle, &args.wait)
        }
    }
}

fn run_notes<T: Transport>(api: &ApiClient<T>, cmd: NoteCmd) -> Result<()> {
    match cmd {
        NoteCmd::List { notebook, json } => {
            let notebook_id = notebook
                .as_deref()
                .map(|token| resolve(api, ResourceKind::Notebook, token))
                .transpose()?;
            if json {
                let mut request = Request::get("/notes");
                if let Some(id) = &notebook_id {
                    request = request.query("notebook_id", id.clone());
                }
                return print_json(&api.raw(request)?);
            }
            print!("{}", ui::notes(&api.list_notes(notebook_id.as_deref())?));
            Ok(())
        }
        NoteCmd::Create {
            content,
            title,
            notebook,
            note_type,
        } => {
            let notebook_id = notebook
                .as_deref()
                .map(|token| resolve(api, ResourceKind::Notebook, token))
                .transpose()?;
            let opts = NoteOptions {
                title: title.as_deref(),
                notebook_id: notebook_id.as_deref(),
                note_type,
            };
            let note = api.create_note(&content, &opts)?;
            println!("Created note: {}", note.id.as_deref().unwrap_or("-"));
            Ok(())
        }
    }
}

fn run_search<T: Transport>(
    api: &ApiClient<T>,
    query: &str,
    search_type: SearchType,
    limit: u32,
    json: bool,
) -> Result<()> {
    if json {
        return print_json(&api.search_raw(query, search_type, limit)?);
    }
    let kind = match search_type {
        SearchType::Text => "text",
        SearchType::Vector => "vector",
    };
    println!("Searching for: '{}' ({} search)", query, kind);
    let results = api.search(query, search_type, limit)?;
    print!("{}", ui::search_results(&results, search_type));
    Ok(())
}

fn run_ask<T: Transport>(
    api: &ApiClient<T>,
    question: &str,
    model: Option<&str>,
    preferred: &str,
    wait: &WaitArgs,
) -> Result<()> {
    println!("Question: {}", question);
    println!("{}", "-".repeat(60));

    let spinner = ui::spinner("Thinking...");
    let outcome = dispatch::ask(api, question, model, preferred);
    spinner.finish_and_clear();

    match outcome.context("AI Q&A requires an embedding model to be configured")? {
        Dispatch::Immediate(answer) => {
            println!(
                "\nAnswer:\n{}",
                answer.answer.as_deref().unwrap_or("No answer generated")
            );
            Ok(())
        }
        Dispatch::Tracked { handle, .. } => report_tracked(api, &handle, wait),
    }
}

fn run_transformations<T: Transport>(
    api: &ApiClient<T>,
    cmd: TransformationCmd,
    preferred: &str,
) -> Result<()> {
    match cmd {
        TransformationCmd::List { json } => {
            if json {
                return print_json(&api.raw(Request::get("/transformations"))?);
            }
            print!("{}", ui::transformations(&api.list_transformations()?));
            Ok(())
        }
        TransformationCmd::Create {
            name,
            title,
            prompt,
            description,
            apply_default,
        } => {
            let created = api.create_transformation(&NewTransformation {
                name: &name,
                title: &title,
                description: &description,
                prompt: &prompt,
                apply_default,
            })?;
            println!("Created transformation: {}", created.name.as_deref().unwrap_or(&name));
            println!("ID: {}", created.id.as_deref().unwrap_or("-"));
            Ok(())
        }
        TransformationCmd::Execute {
            transformation,
            input,
            model,
            wait,
        } => {
            let id = resolve(api, ResourceKind::Transformation, &transformation)?;
            let input_text = read_input(&input)?;
            println!("Executing transformation: {}", transformation);

            let spinner = ui::spinner("Running transformation...");
            let outcome =
                dispatch::execute_transformation(api, &id, &input_text, model.as_deref(), preferred);
            spinner.finish_and_clear();

            match outcome? {
                Dispatch::Immediate(out) => {
                    println!("\nResult:\n{}", out.output.as_deref().unwrap_or("No output"));
                    Ok(())
                }
                Dispatch::Tracked { handle, .. } => report_tracked(api, &handle, &wait),
            }
        }
    }
}

fn run_podcasts<T: Transport>(api: &ApiClient<T>, cmd: PodcastCmd) -> Result<()> {
    match cmd {
        PodcastCmd::List { json } => {
            if json {
                return print_json(&api.raw(Request::get("/podcasts"))?);
            }
            print!("{}", ui::podcasts(&api.list_podcasts()?));
            Ok(())
        }
        PodcastCmd::Create {
            name,
            content,
            episode_profile,
            speaker_profile,
            wait,
        } => {
            let new = NewPodcast {
                name: &name,
                content: &content,
                episode_profile: &episode_profile,
                speaker_profile: &speaker_profile,
            };
            match dispatch::create_podcast(api, &new)? {
                Dispatch::Immediate(podcast) => {
                    println!("Created podcast: {}", podcast.name.as_deref().unwrap_or(&name));
                    if let Some(id) = podcast.id {
                        println!("ID: {}", id);
                    }
                    Ok(())
                }
                Dispatch::Tracked { handle, .. } => report_tracked(api, &handle, &wait),
            }
        }
    }
}

fn report_tracked<T: Transport>(api: &ApiClient<T>, handle: &JobHandle, wait: &WaitArgs) -> Result<()> {
    println!("Job: {}", handle);
    if wait.wait {
        println!("Waiting for job: {}", handle);
        return follow(api, handle, wait.options());
    }
    println!("Check progress with: open-notebook status {} --watch", handle);
    Ok(())
}

/// Poll a job and turn a failed or cancelled outcome into an error.
fn follow<T: Transport>(api: &ApiClient<T>, handle: &JobHandle, opts: PollOptions) -> Result<()> {
    let mut printer = ui::StatusPrinter::stdout();
    let job = poll(api, handle, opts, &mut printer)?;
    if job.status.is_terminal_failure() {
        return Err(Error::JobFailed {
            job_id: handle.to_string(),
            status: job.status,
        }
        .into());
    }
    Ok(())
}

/// Entries of a comma-separated list, trimmed, with blanks dropped.
fn list_entries(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|entry| entry.trim())
        .filter(|entry| !entry.is_empty())
        .map(str::to_string)
        .collect()
}

/// Input given on the command line is read from disk when it names a file.
fn read_input(input: &str) -> Result<String> {
    let path = Path::new(input);
    if !path.is_file() {
        return Ok(input.to_string());
    }
    let text = std::fs::read_to_string(path).map_err(|source| Error::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(text)
}

fn print_json(v: &Value) -> Result<()> {
    println!("{}", ui::to_json(v).context("Failed to render JSON")?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_requires_exactly_an_input() {
        let err = Args::try_parse_from(["open-notebook", "sources", "add", "--notebook", "x"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::MissingRequiredArgument);

        let err = Args::try_parse_from([
            "open-notebook",
            "sources",
            "add",
            "--url",
            "https://a",
            "--text",
            "b",
        ])
        .unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ArgumentConflict);
    }

    #[test]
    fn transformations_split_on_commas() {
        let args = Args::try_parse_from([
            "open-notebook",
            "sources",
            "add",
            "--text",
            "hello",
            "--transformations",
            "summary, key_points,",
        ])
        .unwrap();
        match args.cmd {
            Cmd::Sources {
                cmd: SourceCmd::Add(add),
            } => assert_eq!(list_entries(&add.transformations), vec!["summary", "key_points"]),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_defaults_to_single_query_every_five_seconds() {
        let args = Args::try_parse_from(["open-notebook", "status", "command:1"]).unwrap();
        match args.cmd {
            Cmd::Status {
                watch,
                interval,
                deadline_secs,
                ..
            } => {
                assert!(!watch);
                assert_eq!(interval, 5);
                assert_eq!(deadline_secs, None);
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn exit_code_looks_through_context() {
        let err = anyhow::Error::from(Error::UserInput("x".into())).context("while adding");
        assert_eq!(exit_code(&err), 2);
        assert_eq!(exit_code(&anyhow::anyhow!("plain")), 1);
    }

    #[test]
    fn read_input_prefers_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let file = dir.path().join("input.txt");
        std::fs::write(&file, "from disk").unwrap();
        assert_eq!(read_input(file.to_str().unwrap()).unwrap(), "from disk");
        assert_eq!(read_input("just some words").unwrap(), "just some words");
    }
}
