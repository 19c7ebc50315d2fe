use anyhow::{Context, Result};
use clap::Parser as ClapParser;
use lox::config::{DriverConfig, EXIT_IO_ERROR};
use lox::diagnostics::{self, Diagnostics};
use lox::interpreter::Interpreter;
use lox::keywords::{load_keywords, Keywords};
use lox::parser::ast::StmtKind;
use lox::parser::parse;
use lox::printer;
use lox::scanner::Scanner;
use rustyline::DefaultEditor;
use std::fs;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

#[derive(ClapParser)]
#[command(name = "lox")]
#[command(about = "A small expression language: scanner, parser and interpreter")]
struct Cli {
    /// Script file to run (omit for REPL)
    script: Option<String>,

    /// Path to keywords JSON file
    #[arg(short, long)]
    keywords: Option<String>,

    /// Print every token before parsing
    #[arg(long)]
    dump_tokens: bool,

    /// Print each statement fully parenthesized
    #[arg(long)]
    print_ast: bool,

    /// Print each statement's expression in reverse polish notation
    #[arg(long)]
    rpn: bool,

    /// Only print the one-line header of each diagnostic
    #[arg(long)]
    no_context: bool,
}

impl From<&Cli> for DriverConfig {
    fn from(cli: &Cli) -> Self {
        Self {
            keywords: cli.keywords.clone(),
            dump_tokens: cli.dump_tokens,
            print_ast: cli.print_ast,
            rpn: cli.rpn,
            show_context: !cli.no_context,
        }
    }
}

fn main() -> Result<ExitCode> {
    install_tracing();

    let cli = Cli::parse();
    let config = DriverConfig::from(&cli);
    let keywords = load_keywords(config.keywords.as_deref())?;
    let mut session = Session::new(&keywords, &config);

    match cli.script {
        None => run_prompt(&mut session),
        Some(path) => run_file(&path, &mut session),
    }
}

// Program output owns stdout; logs go to stderr.
fn install_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

/// State that outlives a single unit of work: the globals and the error flags.
struct Session<'a> {
    keywords: &'a Keywords,
    config: &'a DriverConfig,
    interpreter: Interpreter,
    diagnostics: Diagnostics,
}

impl<'a> Session<'a> {
    fn new(keywords: &'a Keywords, config: &'a DriverConfig) -> Self {
        Self {
            keywords,
            config,
            interpreter: Interpreter::new(),
            diagnostics: Diagnostics::new(),
        }
    }

    fn run(&mut self, source: &str) {
        let tokens = Scanner::new(source, self.keywords, &mut self.diagnostics).scan_tokens();
        if self.config.dump_tokens {
            tokens.iter().for_each(|token| println!("{}", token));
        }

        let (statements, had_syntax_error) = parse(tokens, &mut self.diagnostics);
        if self.config.print_ast || self.config.rpn {
            for stmt in &statements {
                if self.config.print_ast {
                    println!("{}", printer::parenthesize_stmt(stmt));
                }
                if self.config.rpn {
                    let expr = match &stmt.kind {
                        StmtKind::Expression(expr) | StmtKind::Print { expr, .. } => Some(expr),
                        StmtKind::Var { initializer, .. } => initializer.as_ref(),
                    };
                    if let Some(expr) = expr {
                        println!("{}", printer::rpn(expr));
                    }
                }
            }
        }

        if !had_syntax_error {
            self.interpreter.run(&statements, &mut self.diagnostics);
        }

        for diagnostic in self.diagnostics.drain() {
            if self.config.show_context {
                eprint!("{}", diagnostics::render(source, &diagnostic));
            } else {
                eprintln!("{}", diagnostic);
            }
        }
    }
}

fn run_prompt(session: &mut Session) -> Result<ExitCode> {
    let mut rl = DefaultEditor::new().context("starting line editor")?;

    let history_path = session.config.history_path();
    if let Some(ref path) = history_path {
        let _ = rl.load_history(path);
    }

    loop {
        match rl.readline("> ") {
            Ok(line) => {
                if !line.trim().is_empty() {
                    let _ = rl.add_history_entry(line.trim());
                    session.run(&line);
                }
                // one bad line must not poison the next
                session.diagnostics.reset();
            }
            Err(rustyline::error::ReadlineError::Eof) => break,
            Err(rustyline::error::ReadlineError::Interrupted) => {
                println!("^C");
            }
            Err(e) => {
                eprintln!("Error: {}", e);
                break;
            }
        }
    }

    if let Some(ref path) = history_path {
        let _ = rl.save_history(path);
    }

    Ok(ExitCode::SUCCESS)
}

fn run_file(path: &str, session: &mut Session) -> Result<ExitCode> {
    let contents = match fs::read_to_string(path).with_context(|| format!("reading script '{}'", path)) {
        Ok(contents) => contents,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            return Ok(ExitCode::from(EXIT_IO_ERROR));
        }
    };

    session.run(&contents);

    let status = DriverConfig::exit_status(
        session.diagnostics.had_syntax_error(),
        session.diagnostics.had_runtime_error(),
    );
    tracing::debug!(status, "script finished");
    Ok(ExitCode::from(status))
}
