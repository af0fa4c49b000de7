// Winefind — tools/winefind-cli/src/main.rs
// Interactive REPL over one winefind session.
// Commands: find, similar, top, stats, indexes, schema, config, history, quit
//
// Build:
//   cargo build --release -p winefind-cli
//
// Usage:
//   winefind-cli            (reads PINECONE_API_KEY and WINEFIND_* from env / .env)
//
// Author: d65v <https://github.com/d65v>

use std::io::{self, BufRead, Write};
use std::process::ExitCode;

use wcore::client::IndexService;
use wcore::present::{self, SearchInput, DEFAULT_TOP_K};
use wcore::{Attribute, IndexHandle, QueryFilter, WineFindConfig};

// ── CLI State ─────────────────────────────────────────────────────────────────

struct CliState<S: IndexService> {
    config: WineFindConfig,
    handle: IndexHandle<S>,
    top_k: usize,
    history: Vec<String>,
}

impl<S: IndexService> CliState<S> {
    fn new(config: WineFindConfig, handle: IndexHandle<S>) -> Self {
        Self {
            config,
            handle,
            top_k: DEFAULT_TOP_K,
            history: Vec::new(),
        }
    }
}

// ── Command Parser ────────────────────────────────────────────────────────────

#[derive(Debug, PartialEq)]
enum Cmd {
    Find { filter: QueryFilter, top_k: Option<usize> },
    Similar { id: String, top_k: Option<usize> },
    TopK(usize),
    Stats,
    Indexes,
    Schema,
    Config,
    History,
    Help,
    Quit,
    Invalid(String),
    Unknown(String),
}

/// Split on whitespace; double quotes group words (`name="pinot noir"`).
fn tokenize(line: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quoted = false;
    for c in line.trim().chars() {
        match c {
            '"' => quoted = !quoted,
            c if c.is_whitespace() && !quoted => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            c => current.push(c),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }
    tokens
}

fn parse_find(args: &[String]) -> Cmd {
    let mut filter = QueryFilter::new();
    let mut top_k = None;
    for arg in args {
        match arg.split_once('=') {
            Some((key, value)) => {
                let Some(attribute) = Attribute::parse(key) else {
                    return Cmd::Invalid(format!("find: unknown criterion '{}'", key));
                };
                if let Err(e) = filter.set(attribute, value) {
                    return Cmd::Invalid(format!("find: {}", e));
                }
            }
            None => match present::parse_top_k(arg) {
                Ok(k) => top_k = Some(k),
                Err(e) => return Cmd::Invalid(format!("find: {}", e)),
            },
        }
    }
    Cmd::Find { filter, top_k }
}

fn parse_cmd(line: &str) -> Cmd {
    let tokens = tokenize(line);
    let Some((head, rest)) = tokens.split_first() else {
        return Cmd::Unknown(String::new());
    };

    match (head.as_str(), rest) {
        ("quit" | "exit" | "q", []) => Cmd::Quit,
        ("help" | "h" | "?", []) => Cmd::Help,
        ("stats", []) => Cmd::Stats,
        ("indexes" | "ls", []) => Cmd::Indexes,
        ("schema", []) => Cmd::Schema,
        ("config", []) => Cmd::Config,
        ("history", []) => Cmd::History,

        ("find" | "f", args) => parse_find(args),

        ("similar" | "sim", [id]) => Cmd::Similar {
            id: id.clone(),
            top_k: None,
        },
        ("similar" | "sim", [id, k]) => match present::parse_top_k(k) {
            Ok(k) => Cmd::Similar {
                id: id.clone(),
                top_k: Some(k),
            },
            Err(e) => Cmd::Invalid(format!("similar: {}", e)),
        },
        ("similar" | "sim", []) => Cmd::Similar {
            id: String::new(),
            top_k: None,
        },

        ("top", [k]) => match present::parse_top_k(k) {
            Ok(k) => Cmd::TopK(k),
            Err(e) => Cmd::Invalid(format!("top: {}", e)),
        },

        _ => Cmd::Unknown(line.trim().to_string()),
    }
}

// ── Command Executor ──────────────────────────────────────────────────────────

fn exec<S: IndexService>(cmd: Cmd, state: &mut CliState<S>) -> bool {
    match cmd {
        Cmd::Quit => {
            println!("bye.");
            return false;
        }

        Cmd::Help => {
            println!(
                r#"
Commands:
  find k=v ... [top_k]      Metadata search (filter mode)
                            criteria: name, region, country, type, color
  similar <id> [top_k]      Wines similar to a stored id (similar mode)
  top <n>                   Set the default number of results (1-10)
  stats                     Show index statistics
  indexes                   List indexes visible to the API key
  schema                    Show the metadata naming table
  config                    Show current configuration
  history                   Show command history
  help                      Show this message
  quit                      Exit

Examples:
  find region=Burgundy country=France
  find name="pinot noir" type=Red 3
  similar wine_123 5
"#
            );
        }

        Cmd::Config => {
            println!("  index       : {}", state.config.index_name);
            println!("  mode        : {}", state.config.mode);
            println!("  schema      : {}", state.config.schema.name);
            println!(
                "  namespace   : {}",
                state.config.namespace.as_deref().unwrap_or("(default)")
            );
            println!("  top_k       : {}", state.top_k);
        }

        Cmd::Schema => print!("{}", present::render_schema(state.handle.schema())),

        Cmd::Stats => match state.handle.describe_stats() {
            Ok(stats) => print!("{}", present::render_stats(state.handle.index(), &stats)),
            Err(e) => eprintln!("error: {}", e),
        },

        Cmd::Indexes => match state.handle.list_indexes() {
            Ok(indexes) => print!(
                "{}",
                present::render_indexes(&indexes, &state.config.index_name)
            ),
            Err(e) => eprintln!("error: {}", e),
        },

        Cmd::TopK(k) => {
            state.top_k = k;
            println!("top_k = {}", k);
        }

        Cmd::Find { filter, top_k } => {
            search(state, SearchInput::Filter(filter), top_k);
        }

        Cmd::Similar { id, top_k } => {
            search(state, SearchInput::Similar(id), top_k);
        }

        Cmd::History => {
            if state.history.is_empty() {
                println!("(no history)");
            } else {
                for (i, h) in state.history.iter().enumerate() {
                    println!("  {:3}  {}", i + 1, h);
                }
            }
        }

        Cmd::Invalid(msg) => eprintln!("error: {}", msg),

        Cmd::Unknown(s) if s.is_empty() => {} // blank line

        Cmd::Unknown(s) => {
            eprintln!("unknown command: '{}'. Type 'help' for commands.", s);
        }
    }
    true
}

/// Run one request if its input shape matches the session's mode.
/// Returns false when the shape is disabled.
fn search<S: IndexService>(state: &CliState<S>, input: SearchInput, top_k: Option<usize>) -> bool {
    if input.mode() != state.config.mode {
        eprintln!(
            "error: {} search is disabled in this session (WINEFIND_MODE={})",
            input.mode(),
            state.config.mode
        );
        return false;
    }

    if let Some(line) = input.progress() {
        println!("{}", line);
    }
    let outcome = present::search(&state.handle, &input, top_k.unwrap_or(state.top_k));
    print!("{}", present::render(&outcome));
    true
}

// ── Main ──────────────────────────────────────────────────────────────────────

fn main() -> ExitCode {
    // Load .env if present (non-fatal if missing)
    let _ = dotenv::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("warn")).init();

    let config = match WineFindConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("[winefind] {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Connecting to index '{}'...", config.index_name);
    let handle = match wcore::connect(&config) {
        Ok(handle) => handle,
        Err(e) => {
            log::error!("Initialization failed: {}", e);
            eprintln!("[winefind] Failed to initialize the index session: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!(
        "Winefind CLI  •  index={}  mode={}  •  type 'help'",
        config.index_name, config.mode
    );
    println!("────────────────────────────────────────────────────");
    println!("{}", present::guidance(config.mode));

    let mut state = CliState::new(config, handle);
    let stdin = io::stdin();
    loop {
        print!("winefind> ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) | Err(_) => break, // EOF
            Ok(_) => {}
        }

        let trimmed = line.trim().to_string();
        if !trimmed.is_empty() {
            state.history.push(trimmed.clone());
        }

        let cmd = parse_cmd(&trimmed);
        if !exec(cmd, &mut state) {
            break;
        }
    }
    ExitCode::SUCCESS
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    use wcore::client::{IndexDescription, IndexStats, QueryRequest};
    use wcore::filter::WineType;
    use wcore::{Match, ResultSet, SearchMode};

    /// Answers every query with one match and counts the calls.
    struct FakeService {
        queries: Cell<usize>,
    }

    impl IndexService for FakeService {
        fn list_indexes(&self) -> wcore::Result<Vec<IndexDescription>> {
            Ok(vec![IndexDescription {
                name: "wine-embeddings".into(),
                dimension: Some(4),
                metric: None,
                host: "wine-embeddings.svc.test".into(),
                status: None,
            }])
        }

        fn describe_index_stats(&self, _: &IndexDescription) -> wcore::Result<IndexStats> {
            Ok(IndexStats::default())
        }

        fn query(&self, _: &IndexDescription, _: &QueryRequest) -> wcore::Result<ResultSet> {
            self.queries.set(self.queries.get() + 1);
            Ok(ResultSet {
                matches: vec![Match {
                    id: "wine_1".into(),
                    score: 0.8,
                    metadata: None,
                }],
                namespace: String::new(),
            })
        }
    }

    fn state(mode: SearchMode) -> CliState<FakeService> {
        let mut config = WineFindConfig::new("pk-test");
        config.mode = mode;
        let service = FakeService {
            queries: Cell::new(0),
        };
        let handle = wcore::connect_with(service, &config).unwrap();
        CliState::new(config, handle)
    }

    #[test]
    fn test_parse_quit() {
        assert_eq!(parse_cmd("quit"), Cmd::Quit);
        assert_eq!(parse_cmd("q"), Cmd::Quit);
        assert_eq!(parse_cmd("exit"), Cmd::Quit);
    }

    #[test]
    fn test_parse_find() {
        let cmd = parse_cmd(r#"find name="pinot noir" type=red region=Burgundy 3"#);
        let Cmd::Find { filter, top_k } = cmd else {
            panic!("expected find, got {:?}", cmd);
        };
        assert_eq!(filter.name.as_deref(), Some("pinot noir"));
        assert_eq!(filter.kind, Some(WineType::Red));
        assert_eq!(filter.region.as_deref(), Some("Burgundy"));
        assert_eq!(top_k, Some(3));
    }

    #[test]
    fn test_parse_find_rejects_bad_input() {
        assert!(matches!(parse_cmd("find vintage=1999"), Cmd::Invalid(_)));
        assert!(matches!(parse_cmd("find color=purple"), Cmd::Invalid(_)));
        assert!(matches!(parse_cmd("find country=Italy 50"), Cmd::Invalid(_)));
    }

    #[test]
    fn test_parse_similar() {
        assert_eq!(
            parse_cmd("similar wine_123 7"),
            Cmd::Similar {
                id: "wine_123".into(),
                top_k: Some(7)
            }
        );
        assert_eq!(
            parse_cmd("sim wine_9"),
            Cmd::Similar {
                id: "wine_9".into(),
                top_k: None
            }
        );
    }

    #[test]
    fn test_parse_top() {
        assert_eq!(parse_cmd("top 10"), Cmd::TopK(10));
        assert!(matches!(parse_cmd("top 0"), Cmd::Invalid(_)));
    }

    #[test]
    fn test_blank_line_is_unknown_empty() {
        assert_eq!(parse_cmd("  "), Cmd::Unknown(String::new()));
    }

    #[test]
    fn test_tokenize_quotes() {
        assert_eq!(
            tokenize(r#"find region="Napa Valley"  country=USA"#),
            vec!["find", "region=Napa Valley", "country=USA"]
        );
    }

    #[test]
    fn test_inactive_mode_makes_no_query() {
        let mut state = state(SearchMode::Filter);
        let input = SearchInput::Similar("wine_1".into());
        assert!(!search(&state, input, None));
        assert!(exec(parse_cmd("similar wine_1"), &mut state));
        assert_eq!(state.handle_queries(), 0);
    }

    #[test]
    fn test_active_mode_queries_once() {
        let mut state = state(SearchMode::Filter);
        assert!(exec(parse_cmd("find country=France"), &mut state));
        assert_eq!(state.handle_queries(), 1);

        // blank criteria only show guidance
        assert!(exec(parse_cmd("find"), &mut state));
        assert_eq!(state.handle_queries(), 1);
    }

    #[test]
    fn test_top_sets_default() {
        let mut state = state(SearchMode::Similar);
        exec(Cmd::TopK(9), &mut state);
        assert_eq!(state.top_k, 9);
        assert!(!exec(Cmd::Quit, &mut state));
    }

    impl CliState<FakeService> {
        fn handle_queries(&self) -> usize {
            self.handle.service().queries.get()
        }
    }
}
